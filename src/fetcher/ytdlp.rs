use async_trait::async_trait;
use chrono::Local;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::{output_path, LocalFile, MediaDownloader, MediaFormat, MediaRequest};
use crate::PipelineError;

/// Downloader backed by the yt-dlp command-line tool
pub struct YtDlpDownloader {
    yt_dlp_path: String,
    output_dir: PathBuf,
}

impl YtDlpDownloader {
    pub fn new(yt_dlp_path: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Run yt-dlp and wait for it, surfacing stderr on failure
    async fn run(&self, args: &[String]) -> Result<(), PipelineError> {
        tracing::debug!("Running {} {}", self.yt_dlp_path, args.join(" "));

        let output = Command::new(&self.yt_dlp_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                PipelineError::DownloadError(format!(
                    "could not start {}: {}",
                    self.yt_dlp_path, e
                ))
            })?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            let code = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(PipelineError::DownloadError(format!(
                "yt-dlp exited with {}: {}",
                code,
                error.trim()
            )));
        }

        Ok(())
    }
}

/// Arguments for extracting best-quality audio into an mp3 file
pub fn extract_audio_args(url: &str, output_path: &Path) -> Vec<String> {
    [
        "--quiet",
        "--no-playlist",
        "--extract-audio",
        "--audio-format",
        "mp3",
        // 0 is the best VBR quality
        "--audio-quality",
        "0",
        "-o",
    ]
    .iter()
    .map(|s| s.to_string())
    .chain([output_path.to_string_lossy().into_owned(), url.to_string()])
    .collect()
}

/// Arguments for fetching the best stream that is already mp4, without transcoding
pub fn fetch_best_video_args(url: &str, output_path: &Path) -> Vec<String> {
    ["--quiet", "--no-playlist", "-f", "best[ext=mp4]", "-o"]
        .iter()
        .map(|s| s.to_string())
        .chain([output_path.to_string_lossy().into_owned(), url.to_string()])
        .collect()
}

#[async_trait]
impl MediaDownloader for YtDlpDownloader {
    async fn download(&self, request: &MediaRequest) -> Result<LocalFile, PipelineError> {
        let created_at = Local::now();
        let path = output_path(&self.output_dir, request.format, created_at);

        tracing::info!("Downloading {} to: {}", request.format, path.display());

        let args = match request.format {
            MediaFormat::Audio => extract_audio_args(&request.url, &path),
            MediaFormat::Video => fetch_best_video_args(&request.url, &path),
        };
        self.run(&args).await?;

        // The file on disk is the only proof the download worked
        if !path.is_file() {
            return Err(PipelineError::DownloadError(format!(
                "yt-dlp finished but no file was written to {}",
                path.display()
            )));
        }

        Ok(LocalFile { path, created_at })
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}
