//! Upload a local file and wait for the service to finish preprocessing it.
//!
//! Polling runs at a fixed interval until the file is `ACTIVE`, `FAILED`, or the deadline
//! passes. The deadline is checked before each status query, so a 10s timeout with a 5s
//! interval queries at 0s and 5s and gives up at 10s.

use std::time::Duration;
use tokio::time::{sleep, Instant};

use super::{FileState, RemoteFileHandle, RemoteFileService};
use crate::fetcher::LocalFile;
use crate::pipeline::ProgressObserver;
use crate::PipelineError;

/// Wait limits for remote processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            interval: Duration::from_secs(5),
        }
    }
}

/// Snapshot handed to the observer after every status query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollProgress {
    /// 1-based poll counter
    pub poll: u32,
    pub elapsed: Duration,
    pub remaining: Duration,
    pub status: FileState,
}

/// How waiting for a remote file ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Ready(RemoteFileHandle),
    Failed {
        handle: RemoteFileHandle,
        reason: String,
    },
    TimedOut {
        handle: RemoteFileHandle,
        elapsed: Duration,
        polls: u32,
    },
}

/// Poll `handle` until it leaves the processing state or `started + timeout` passes
pub async fn await_active(
    service: &dyn RemoteFileService,
    mut handle: RemoteFileHandle,
    started: Instant,
    options: PollOptions,
    observer: &dyn ProgressObserver,
) -> Result<PollOutcome, PipelineError> {
    let mut polls = 0u32;

    loop {
        let elapsed = started.elapsed();
        if elapsed >= options.timeout {
            return Ok(PollOutcome::TimedOut {
                handle,
                elapsed,
                polls,
            });
        }

        let status = service
            .get_status(&handle.id)
            .await
            .map_err(|e| PipelineError::UploadError {
                id: Some(handle.id.clone()),
                message: format!("status check for {} failed: {}", handle.id, e),
            })?;
        polls += 1;
        handle.status = status;

        let elapsed = started.elapsed();
        observer.on_poll(&PollProgress {
            poll: polls,
            elapsed,
            remaining: options.timeout.saturating_sub(elapsed),
            status,
        });
        tracing::debug!("Poll #{} for {}: {}", polls, handle.id, status);

        match status {
            FileState::Active => return Ok(PollOutcome::Ready(handle)),
            FileState::Failed => {
                return Ok(PollOutcome::Failed {
                    handle,
                    reason: "the service could not process the file".to_string(),
                })
            }
            FileState::Processing | FileState::Unknown => sleep(options.interval).await,
        }
    }
}

/// Upload the file, then wait for it to become `ACTIVE`
pub async fn upload_and_await_active(
    service: &dyn RemoteFileService,
    local: &LocalFile,
    mime_type: &str,
    options: PollOptions,
    observer: &dyn ProgressObserver,
) -> Result<RemoteFileHandle, PipelineError> {
    let started = Instant::now();

    let bytes = tokio::fs::read(&local.path)
        .await
        .map_err(|e| PipelineError::UploadError {
            id: None,
            message: format!("could not read {}: {}", local.path.display(), e),
        })?;

    tracing::info!(
        "Uploading {} ({})",
        local.display_name(),
        crate::utils::format_file_size(bytes.len() as u64)
    );

    let handle = service
        .upload(bytes, mime_type, &local.display_name())
        .await
        .map_err(|e| PipelineError::UploadError {
            id: None,
            message: e.to_string(),
        })?;

    tracing::info!("Upload complete: {} ({})", handle.id, handle.uri);
    observer.on_stage(crate::pipeline::PipelineStage::Polling);

    match await_active(service, handle, started, options, observer).await? {
        PollOutcome::Ready(handle) => {
            tracing::info!("Remote file {} is ACTIVE", handle.id);
            Ok(handle)
        }
        PollOutcome::Failed { handle, reason } => Err(PipelineError::RemoteProcessingFailed {
            id: handle.id,
            reason,
        }),
        PollOutcome::TimedOut { handle, elapsed, .. } => {
            Err(PipelineError::RemoteProcessingTimeout {
                id: handle.id,
                waited: elapsed,
                last_status: handle.status,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::NoopObserver;
    use crate::remote::MockRemoteFileService;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    fn handle(status: FileState) -> RemoteFileHandle {
        RemoteFileHandle {
            id: "files/abc".to_string(),
            uri: "https://example.com/files/abc".to_string(),
            mime_type: "audio/mpeg".to_string(),
            status,
        }
    }

    /// Service whose status queries replay `states`, repeating the last one
    fn scripted(states: Vec<FileState>, calls: Arc<AtomicU32>) -> MockRemoteFileService {
        let mut service = MockRemoteFileService::new();
        service
            .expect_upload()
            .returning(|_, _, _| Ok(handle(FileState::Processing)));
        service.expect_get_status().returning(move |id| {
            assert_eq!(id, "files/abc");
            let n = calls.fetch_add(1, Ordering::SeqCst) as usize;
            Ok(states[n.min(states.len() - 1)])
        });
        service
    }

    fn local_file(dir: &tempfile::TempDir) -> LocalFile {
        let path = dir.path().join("file_20240101_000000.mp3");
        fs_err::write(&path, b"media").unwrap();
        LocalFile {
            path,
            created_at: chrono::Local::now(),
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<PollProgress>>);

    impl ProgressObserver for Recorder {
        fn on_poll(&self, progress: &PollProgress) {
            self.0.lock().unwrap().push(*progress);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_becomes_active_after_three_polls() {
        let calls = Arc::new(AtomicU32::new(0));
        let service = scripted(
            vec![FileState::Processing, FileState::Processing, FileState::Active],
            calls.clone(),
        );
        let recorder = Recorder::default();

        let started = Instant::now();
        let outcome = await_active(
            &service,
            handle(FileState::Processing),
            started,
            PollOptions::default(),
            &recorder,
        )
        .await
        .unwrap();

        assert_eq!(outcome, PollOutcome::Ready(handle(FileState::Active)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_secs(10));
        assert!(started.elapsed() < Duration::from_secs(11));

        let seen = recorder.0.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].remaining, Duration::from_secs(300));
        assert_eq!(seen[2].elapsed.as_secs(), 10);
        assert_eq!(seen[2].status, FileState::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_after_two_polls() {
        let calls = Arc::new(AtomicU32::new(0));
        let service = scripted(vec![FileState::Processing], calls.clone());
        let options = PollOptions {
            timeout: Duration::from_secs(10),
            interval: Duration::from_secs(5),
        };

        let outcome = await_active(
            &service,
            handle(FileState::Processing),
            Instant::now(),
            options,
            &NoopObserver,
        )
        .await
        .unwrap();

        match outcome {
            PollOutcome::TimedOut { polls, elapsed, handle } => {
                assert_eq!(polls, 2);
                assert_eq!(elapsed.as_secs(), 10);
                assert_eq!(handle.status, FileState::Processing);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_on_first_poll_stops_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let service = scripted(vec![FileState::Failed, FileState::Active], calls.clone());

        let outcome = await_active(
            &service,
            handle(FileState::Processing),
            Instant::now(),
            PollOptions::default(),
            &NoopObserver,
        )
        .await
        .unwrap();

        assert!(matches!(outcome, PollOutcome::Failed { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_state_keeps_polling() {
        let calls = Arc::new(AtomicU32::new(0));
        let service = scripted(vec![FileState::Unknown, FileState::Active], calls.clone());

        let outcome = await_active(
            &service,
            handle(FileState::Processing),
            Instant::now(),
            PollOptions::default(),
            &NoopObserver,
        )
        .await
        .unwrap();

        assert!(matches!(outcome, PollOutcome::Ready(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_and_await_maps_timeout_to_error() {
        let dir = tempfile::tempdir().unwrap();
        let local = local_file(&dir);
        let service = scripted(vec![FileState::Processing], Arc::new(AtomicU32::new(0)));
        let options = PollOptions {
            timeout: Duration::from_secs(10),
            interval: Duration::from_secs(5),
        };

        let err = upload_and_await_active(&service, &local, "audio/mpeg", options, &NoopObserver)
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::RemoteProcessingTimeout { ref id, .. } if id == "files/abc"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_and_await_maps_failure_to_error() {
        let dir = tempfile::tempdir().unwrap();
        let local = local_file(&dir);
        let service = scripted(vec![FileState::Failed], Arc::new(AtomicU32::new(0)));

        let err = upload_and_await_active(
            &service,
            &local,
            "audio/mpeg",
            PollOptions::default(),
            &NoopObserver,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PipelineError::RemoteProcessingFailed { .. }));
    }

    #[tokio::test]
    async fn test_upload_rejection_is_upload_error() {
        let dir = tempfile::tempdir().unwrap();
        let local = local_file(&dir);
        let mut service = MockRemoteFileService::new();
        service.expect_upload().returning(|_, _, _| {
            Err(crate::remote::RemoteError::Api {
                status: 400,
                message: "bad request".to_string(),
            })
        });
        service.expect_get_status().never();

        let err = upload_and_await_active(
            &service,
            &local,
            "audio/mpeg",
            PollOptions::default(),
            &NoopObserver,
        )
        .await
        .unwrap_err();

        match err {
            PipelineError::UploadError { id, message } => {
                assert_eq!(id, None);
                assert!(message.contains("bad request"));
            }
            other => panic!("expected UploadError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_status_query_error_keeps_remote_id() {
        let dir = tempfile::tempdir().unwrap();
        let local = local_file(&dir);
        let mut service = MockRemoteFileService::new();
        service
            .expect_upload()
            .returning(|_, _, _| Ok(handle(FileState::Processing)));
        service.expect_get_status().times(1).returning(|_| {
            Err(crate::remote::RemoteError::InvalidResponse("garbled".to_string()))
        });

        let err = upload_and_await_active(
            &service,
            &local,
            "audio/mpeg",
            PollOptions::default(),
            &NoopObserver,
        )
        .await
        .unwrap_err();

        match err {
            PipelineError::UploadError { id, message } => {
                assert_eq!(id.as_deref(), Some("files/abc"));
                assert!(message.contains("garbled"));
            }
            other => panic!("expected UploadError, got {:?}", other),
        }
    }
}
