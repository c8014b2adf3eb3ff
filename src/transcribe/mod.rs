use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::remote::{FileState, RemoteFileHandle, RemoteFileService};
use crate::PipelineError;

/// Language requested when none is configured
pub const DEFAULT_LANGUAGE: &str = "Indonesian";

/// Upper bound for a single model request; the model has to process the full media
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// Transcript text exactly as the model returned it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptResult {
    pub text: String,
}

/// Fixed instructions sent ahead of the file, in order
pub fn prompt_parts(language: &str) -> Vec<String> {
    vec![
        format!(
            "You are an expert transcriptionist. Transcribe the audio of this media into {}.",
            language
        ),
        "Write the transcript completely and accurately, word for word.".to_string(),
        "Return only the transcript text, without any introduction or additional remarks."
            .to_string(),
    ]
}

/// Requests a transcript for an uploaded file
#[derive(Debug, Clone)]
pub struct Transcriber {
    language: String,
    timeout: Duration,
}

impl Transcriber {
    pub fn new(language: impl Into<String>, timeout: Duration) -> Self {
        Self {
            language: language.into(),
            timeout,
        }
    }

    /// Single attempt; a failed or timed-out request is returned as-is
    pub async fn transcribe(
        &self,
        service: &dyn RemoteFileService,
        handle: &RemoteFileHandle,
    ) -> Result<TranscriptResult, PipelineError> {
        if handle.status != FileState::Active {
            return Err(PipelineError::TranscriptionError(format!(
                "remote file {} is {}, not ACTIVE",
                handle.id, handle.status
            )));
        }

        tracing::info!(
            "Requesting {} transcript for {} (timeout {}s)",
            self.language,
            handle.id,
            self.timeout.as_secs()
        );

        let text = service
            .generate(&prompt_parts(&self.language), handle, self.timeout)
            .await
            .map_err(|e| PipelineError::TranscriptionError(e.to_string()))?;

        Ok(TranscriptResult { text })
    }
}

impl Default for Transcriber {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGE, DEFAULT_REQUEST_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{MockRemoteFileService, RemoteError};

    fn handle(status: FileState) -> RemoteFileHandle {
        RemoteFileHandle {
            id: "files/abc".to_string(),
            uri: "https://example.com/files/abc".to_string(),
            mime_type: "video/mp4".to_string(),
            status,
        }
    }

    #[test]
    fn test_prompt_parts_order() {
        let parts = prompt_parts("English");
        assert_eq!(parts.len(), 3);
        assert!(parts[0].contains("expert transcriptionist"));
        assert!(parts[0].contains("English"));
        assert!(parts[1].contains("word for word"));
        assert!(parts[2].starts_with("Return only the transcript text"));
    }

    #[tokio::test]
    async fn test_returns_model_text_verbatim() {
        let mut service = MockRemoteFileService::new();
        service
            .expect_generate()
            .withf(|prompt, file, timeout| {
                prompt.to_vec() == prompt_parts("Indonesian")
                    && file.id == "files/abc"
                    && *timeout == Duration::from_secs(600)
            })
            .times(1)
            .returning(|_, _, _| Ok("  halo dunia\n".to_string()));

        let result = Transcriber::default()
            .transcribe(&service, &handle(FileState::Active))
            .await
            .unwrap();

        assert_eq!(result.text, "  halo dunia\n");
    }

    #[tokio::test]
    async fn test_refuses_file_that_is_not_active() {
        let mut service = MockRemoteFileService::new();
        service.expect_generate().never();

        let err = Transcriber::default()
            .transcribe(&service, &handle(FileState::Processing))
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::TranscriptionError(ref m) if m.contains("PROCESSING")));
    }

    #[tokio::test]
    async fn test_model_failure_is_not_retried() {
        let mut service = MockRemoteFileService::new();
        service.expect_generate().times(1).returning(|_, _, _| {
            Err(RemoteError::Api {
                status: 504,
                message: "deadline exceeded".to_string(),
            })
        });

        let err = Transcriber::new("English", Duration::from_secs(30))
            .transcribe(&service, &handle(FileState::Active))
            .await
            .unwrap_err();

        match err {
            PipelineError::TranscriptionError(detail) => {
                assert!(detail.contains("deadline exceeded"))
            }
            other => panic!("expected TranscriptionError, got {:?}", other),
        }
    }
}
