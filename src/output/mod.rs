use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

use crate::cli::OutputFormat;
use crate::fetcher::{MediaFormat, MediaRequest};
use crate::pipeline::PipelineOutput;

/// Everything written for `--output-format json`
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptReport<'a> {
    pub url: &'a str,
    pub format: MediaFormat,
    pub language: &'a str,
    pub remote_file: &'a str,
    pub transcript: &'a str,
    pub completed_at: DateTime<Utc>,
}

impl<'a> TranscriptReport<'a> {
    pub fn new(request: &'a MediaRequest, language: &'a str, output: &'a PipelineOutput) -> Self {
        Self {
            url: &request.url,
            format: request.format,
            language,
            remote_file: &output.remote_id,
            transcript: &output.transcript.text,
            completed_at: Utc::now(),
        }
    }
}

/// Render the report; text output is the transcript alone
pub fn render(report: &TranscriptReport<'_>, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(report.transcript.to_string()),
        OutputFormat::Json => {
            serde_json::to_string_pretty(report).context("Failed to serialize transcript")
        }
    }
}

/// Save transcript to file
pub async fn save_to_file(
    report: &TranscriptReport<'_>,
    path: &Path,
    format: &OutputFormat,
) -> Result<()> {
    let content = render(report, format)?;
    fs_err::write(path, content)?;
    Ok(())
}

/// Print transcript to console
pub fn print_to_console(report: &TranscriptReport<'_>, format: &OutputFormat) -> Result<()> {
    println!("{}", render(report, format)?);
    Ok(())
}
