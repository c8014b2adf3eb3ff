use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod gemini;
pub mod poller;

pub use gemini::GeminiClient;
pub use poller::{await_active, upload_and_await_active, PollOptions, PollOutcome, PollProgress};

/// Processing state of a file stored by the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileState {
    Processing,
    Active,
    Failed,
    Unknown,
}

impl FileState {
    /// Map the service's state string; unrecognised values become `Unknown`
    pub fn from_api(state: &str) -> Self {
        match state {
            "PROCESSING" => FileState::Processing,
            "ACTIVE" => FileState::Active,
            "FAILED" => FileState::Failed,
            _ => FileState::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileState::Processing => "PROCESSING",
            FileState::Active => "ACTIVE",
            FileState::Failed => "FAILED",
            FileState::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for FileState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to a file held by the remote service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFileHandle {
    /// Resource name, e.g. `files/abc123`
    pub id: String,

    /// URI the model uses to read the file
    pub uri: String,

    pub mime_type: String,

    /// Last observed state; only refreshed by querying the service
    pub status: FileState,
}

/// Errors from talking to the remote service
#[derive(thiserror::Error, Debug)]
pub enum RemoteError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
}

/// Operations consumed from the remote file/model service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteFileService: Send + Sync {
    /// Store the bytes remotely and return the new handle
    async fn upload(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        display_name: &str,
    ) -> Result<RemoteFileHandle, RemoteError>;

    /// Current processing state of a stored file
    async fn get_status(&self, id: &str) -> Result<FileState, RemoteError>;

    /// Ask the model to answer `prompt` with the file attached as content
    async fn generate(
        &self,
        prompt: &[String],
        file: &RemoteFileHandle,
        timeout: Duration,
    ) -> Result<String, RemoteError>;

    async fn delete(&self, id: &str) -> Result<(), RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_state_from_api() {
        assert_eq!(FileState::from_api("ACTIVE"), FileState::Active);
        assert_eq!(FileState::from_api("PROCESSING"), FileState::Processing);
        assert_eq!(FileState::from_api("FAILED"), FileState::Failed);
        assert_eq!(FileState::from_api("STATE_UNSPECIFIED"), FileState::Unknown);
        assert_eq!(FileState::from_api("active"), FileState::Unknown);
    }
}
