use std::time::Duration;

use crate::fetcher::MediaFormat;

/// Format file size in human-readable format
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f = bytes as f64;
    let unit_index = (bytes_f.log10() / THRESHOLD.log10()).floor() as usize;
    let unit_index = unit_index.min(UNITS.len() - 1);

    let size = bytes_f / THRESHOLD.powi(unit_index as i32);

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Format duration in human-readable format
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// `mm:ss` countdown shown while waiting on the remote service
pub fn format_countdown(remaining: Duration) -> String {
    let total = remaining.as_secs();
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Check if the current environment has the tools needed for `format`
pub async fn check_dependencies(yt_dlp: &str, format: MediaFormat) -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available(yt_dlp).await {
        missing.push(format!("{} - required to download media", yt_dlp));
    }

    // yt-dlp needs ffmpeg to convert audio to mp3
    if format == MediaFormat::Audio && !check_command_available("ffmpeg").await {
        missing.push("ffmpeg - required for audio extraction".to_string());
    }

    missing
}

/// Check if a command is available in PATH
async fn check_command_available(command: &str) -> bool {
    use tokio::process::Command;

    Command::new(command)
        .arg("--version")
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}
