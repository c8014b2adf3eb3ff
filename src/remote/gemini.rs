use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::{FileState, RemoteError, RemoteFileHandle, RemoteFileService};
use crate::config::GeminiConfig;

const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

/// File resource as returned by the Gemini File API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileResource {
    name: String,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: FileResource,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Gemini REST client for the File API and `generateContent`
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    /// Build a client from config and the API key loaded at startup
    pub fn new(config: &GeminiConfig, api_key: impl Into<String>) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .user_agent(concat!("media-transcriptor/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/v1beta/{}", self.base_url, path)
    }

    /// Turn non-2xx responses into `RemoteError::Api`
    async fn check(response: Response) -> Result<Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Api {
            status: status.as_u16(),
            message: error_message(&body),
        })
    }
}

/// Prefer the JSON error message, fall back to the raw body
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "no error details".to_string()
            } else {
                trimmed.to_string()
            }
        })
}

fn into_handle(file: FileResource, fallback_mime: &str) -> RemoteFileHandle {
    RemoteFileHandle {
        status: file
            .state
            .as_deref()
            .map(FileState::from_api)
            .unwrap_or(FileState::Unknown),
        id: file.name,
        uri: file.uri,
        mime_type: file.mime_type.unwrap_or_else(|| fallback_mime.to_string()),
    }
}

/// Request body: instruction parts in order, then the file reference
fn generate_body(prompt: &[String], file: &RemoteFileHandle) -> Value {
    let mut parts: Vec<Value> = prompt.iter().map(|text| json!({ "text": text })).collect();
    parts.push(json!({
        "file_data": {
            "mime_type": file.mime_type,
            "file_uri": file.uri,
        }
    }));

    json!({
        "contents": [{
            "role": "user",
            "parts": parts,
        }]
    })
}

/// Concatenate the first candidate's text parts
fn response_text(response: GenerateResponse) -> Result<String, RemoteError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(RemoteError::InvalidResponse(format!(
            "model returned no transcript: {}",
            reason
        )));
    };

    let texts: Vec<String> = candidate
        .content
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if texts.is_empty() {
        tracing::debug!(
            "Model returned no text (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        );
    }

    Ok(texts.concat())
}

#[async_trait]
impl RemoteFileService for GeminiClient {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        display_name: &str,
    ) -> Result<RemoteFileHandle, RemoteError> {
        tracing::debug!("Starting resumable upload of {} bytes", bytes.len());

        let start = self
            .client
            .post(format!("{}/upload/v1beta/files", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&json!({ "file": { "display_name": display_name } }))
            .send()
            .await?;
        let start = Self::check(start).await?;

        let upload_url = start
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .ok_or_else(|| RemoteError::InvalidResponse("missing upload URL header".to_string()))?;

        let finish = self
            .client
            .post(upload_url)
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .send()
            .await?;
        let uploaded: UploadResponse = Self::check(finish).await?.json().await?;

        Ok(into_handle(uploaded.file, mime_type))
    }

    async fn get_status(&self, id: &str) -> Result<FileState, RemoteError> {
        let response = self
            .client
            .get(self.api_url(id))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        let file: FileResource = Self::check(response).await?.json().await?;

        Ok(file
            .state
            .as_deref()
            .map(FileState::from_api)
            .unwrap_or(FileState::Unknown))
    }

    async fn generate(
        &self,
        prompt: &[String],
        file: &RemoteFileHandle,
        timeout: Duration,
    ) -> Result<String, RemoteError> {
        tracing::debug!("Requesting content from model {} for {}", self.model, file.id);

        let response = self
            .client
            .post(self.api_url(&format!("models/{}:generateContent", self.model)))
            .header(API_KEY_HEADER, &self.api_key)
            .timeout(timeout)
            .json(&generate_body(prompt, file))
            .send()
            .await?;
        let parsed: GenerateResponse = Self::check(response).await?.json().await?;

        response_text(parsed)
    }

    async fn delete(&self, id: &str) -> Result<(), RemoteError> {
        let response = self
            .client
            .delete(self.api_url(id))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
