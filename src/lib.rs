//! Media Transcriptor - download a social-media post and transcribe it with Gemini
//!
//! The library fetches media with yt-dlp, uploads it to the Gemini File API, waits for the
//! remote file to become usable, asks a model for a transcript and cleans up both copies.

use std::path::PathBuf;
use std::time::Duration;

pub mod cli;
pub mod config;
pub mod fetcher;
pub mod output;
pub mod pipeline;
pub mod remote;
pub mod transcribe;
pub mod utils;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use fetcher::{is_valid_url, LocalFile, MediaDownloader, MediaFormat, MediaRequest};
pub use pipeline::{PipelineOutput, PipelineStage, ProgressObserver, TranscriptionPipeline};
pub use remote::{FileState, RemoteFileHandle, RemoteFileService};
pub use transcribe::{TranscriptResult, Transcriber};

/// Result type used at the application boundary
pub type Result<T> = anyhow::Result<T>;

/// Failures that abort a pipeline run
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Download failed: {0}")]
    DownloadError(String),

    /// `id` is set once the upload has produced a remote file
    #[error("Upload failed: {message}")]
    UploadError { id: Option<String>, message: String },

    #[error("Remote processing failed for {id}: {reason}")]
    RemoteProcessingFailed { id: String, reason: String },

    #[error("Remote file {id} did not become ACTIVE within {}s (last status: {last_status})", .waited.as_secs())]
    RemoteProcessingTimeout {
        id: String,
        waited: Duration,
        last_status: FileState,
    },

    #[error("Transcription failed: {0}")]
    TranscriptionError(String),
}

/// Non-fatal problems reported by cleanup
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CleanupWarning {
    #[error("Could not delete local file {}: {message}", .path.display())]
    LocalFile { path: PathBuf, message: String },

    #[error("Could not delete remote file {id}: {message}")]
    RemoteFile { id: String, message: String },
}
