use std::path::PathBuf;

pub mod cleanup;

pub use cleanup::cleanup;

use crate::fetcher::{validate_url, MediaDownloader, MediaRequest, Platform};
use crate::remote::{upload_and_await_active, PollOptions, PollProgress, RemoteFileService};
use crate::transcribe::{TranscriptResult, Transcriber};
use crate::{CleanupWarning, PipelineError};

/// Stages of one run, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Validating,
    Downloading,
    Uploading,
    Polling,
    Transcribing,
    Cleaning,
    Done,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PipelineStage::Validating => "Validating URL",
            PipelineStage::Downloading => "Downloading media",
            PipelineStage::Uploading => "Uploading to Gemini",
            PipelineStage::Polling => "Waiting for file to become ACTIVE",
            PipelineStage::Transcribing => "Requesting transcript",
            PipelineStage::Cleaning => "Cleaning up",
            PipelineStage::Done => "Done",
        };
        f.write_str(label)
    }
}

/// Receives progress from a run; every method defaults to doing nothing
pub trait ProgressObserver: Send + Sync {
    fn on_stage(&self, _stage: PipelineStage) {}

    fn on_poll(&self, _progress: &PollProgress) {}

    fn on_warning(&self, _warning: &CleanupWarning) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {}

/// What a successful run hands back to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutput {
    pub transcript: TranscriptResult,
    /// Path of the deleted (or undeletable) local download
    pub local_path: PathBuf,
    pub remote_id: String,
    pub warnings: Vec<CleanupWarning>,
}

/// Download, upload, wait, transcribe, clean up
pub struct TranscriptionPipeline<D, S> {
    downloader: D,
    service: S,
    transcriber: Transcriber,
    poll: PollOptions,
    cleanup_on_failure: bool,
}

impl<D, S> TranscriptionPipeline<D, S>
where
    D: MediaDownloader,
    S: RemoteFileService,
{
    pub fn new(downloader: D, service: S, transcriber: Transcriber, poll: PollOptions) -> Self {
        Self {
            downloader,
            service,
            transcriber,
            poll,
            cleanup_on_failure: false,
        }
    }

    /// Also clean up after a failed run.
    ///
    /// Off by default: a run that fails after downloading or uploading leaves the local
    /// file and the remote file in place.
    pub fn with_cleanup_on_failure(mut self, enabled: bool) -> Self {
        self.cleanup_on_failure = enabled;
        self
    }

    /// Run every stage, stopping at the first failure
    pub async fn run(
        &self,
        request: &MediaRequest,
        observer: &dyn ProgressObserver,
    ) -> Result<PipelineOutput, PipelineError> {
        observer.on_stage(PipelineStage::Validating);
        let url = validate_url(&request.url)?;
        tracing::info!(
            "Starting {} transcription for {} URL: {}",
            request.format,
            Platform::detect(&url).name(),
            request.url
        );

        observer.on_stage(PipelineStage::Downloading);
        let local = self.downloader.download(request).await?;
        tracing::info!(
            "Downloaded with {}: {}",
            self.downloader.name(),
            local.path.display()
        );

        observer.on_stage(PipelineStage::Uploading);
        let handle = match upload_and_await_active(
            &self.service,
            &local,
            request.format.mime_type(),
            self.poll,
            observer,
        )
        .await
        {
            Ok(handle) => handle,
            Err(err) => {
                let remote_id = match &err {
                    PipelineError::RemoteProcessingFailed { id, .. }
                    | PipelineError::RemoteProcessingTimeout { id, .. } => Some(id.clone()),
                    PipelineError::UploadError { id, .. } => id.clone(),
                    _ => None,
                };
                return Err(self
                    .fail(err, &local.path, remote_id.as_deref(), observer)
                    .await);
            }
        };

        observer.on_stage(PipelineStage::Transcribing);
        let transcript = match self.transcriber.transcribe(&self.service, &handle).await {
            Ok(transcript) => transcript,
            Err(err) => {
                return Err(self
                    .fail(err, &local.path, Some(handle.id.as_str()), observer)
                    .await)
            }
        };
        tracing::info!("Transcript received ({} characters)", transcript.text.len());

        observer.on_stage(PipelineStage::Cleaning);
        let warnings = cleanup(
            Some(local.path.as_path()),
            Some(handle.id.as_str()),
            &self.service,
        )
        .await;
        for warning in &warnings {
            observer.on_warning(warning);
        }

        observer.on_stage(PipelineStage::Done);
        Ok(PipelineOutput {
            transcript,
            local_path: local.path,
            remote_id: handle.id,
            warnings,
        })
    }

    /// Surface `err`, cleaning up first only when enabled
    async fn fail(
        &self,
        err: PipelineError,
        local: &std::path::Path,
        remote_id: Option<&str>,
        observer: &dyn ProgressObserver,
    ) -> PipelineError {
        if self.cleanup_on_failure {
            tracing::info!("Cleaning up after failure: {}", err);
            for warning in cleanup(Some(local), remote_id, &self.service).await {
                observer.on_warning(&warning);
            }
        } else {
            tracing::debug!(
                "Leaving {} and remote file {} in place after failure",
                local.display(),
                remote_id.unwrap_or("(none)")
            );
        }
        err
    }
}
