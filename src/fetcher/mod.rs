use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod validate;
pub mod ytdlp;

pub use validate::{is_valid_url, validate_url, Platform};
pub use ytdlp::YtDlpDownloader;

use crate::PipelineError;

/// What the user asked for: a post URL and the kind of media to fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRequest {
    /// Social-media post URL
    pub url: String,

    /// Audio-only or full video
    pub format: MediaFormat,
}

impl MediaRequest {
    pub fn new(url: impl Into<String>, format: MediaFormat) -> Self {
        Self {
            url: url.into(),
            format,
        }
    }
}

/// Media kinds the downloader can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    /// Best-quality audio transcoded to mp3 (fast)
    Audio,
    /// Best available mp4 stream (for visual context)
    Video,
}

impl MediaFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            MediaFormat::Audio => "mp3",
            MediaFormat::Video => "mp4",
        }
    }

    /// MIME type announced to the remote service on upload
    pub fn mime_type(&self) -> &'static str {
        match self {
            MediaFormat::Audio => "audio/mpeg",
            MediaFormat::Video => "video/mp4",
        }
    }
}

impl std::fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaFormat::Audio => write!(f, "audio"),
            MediaFormat::Video => write!(f, "video"),
        }
    }
}

/// A downloaded file owned by one pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub path: PathBuf,
    pub created_at: DateTime<Local>,
}

impl LocalFile {
    /// Name shown to the remote service
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Build `file_<YYYYMMDD_HHMMSS>.<ext>`.
///
/// Unique at second resolution for sequential runs only; two runs started in the same
/// second collide.
pub fn output_filename(format: MediaFormat, timestamp: DateTime<Local>) -> String {
    format!(
        "file_{}.{}",
        timestamp.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

/// Full output path inside `dir` for a download started at `timestamp`
pub fn output_path(dir: &Path, format: MediaFormat, timestamp: DateTime<Local>) -> PathBuf {
    dir.join(output_filename(format, timestamp))
}

/// Materializes a local media file for a request
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    /// Download the media and return the file it produced
    async fn download(&self, request: &MediaRequest) -> Result<LocalFile, PipelineError>;

    /// Name used in logs
    fn name(&self) -> &'static str;
}
