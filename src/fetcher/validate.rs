use url::Url;

use crate::PipelineError;

/// Platforms we know by name; anything else yt-dlp understands is still accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    YouTube,
    Instagram,
    TikTok,
    Twitter,
    Facebook,
    Other,
}

impl Platform {
    pub const KNOWN: [Platform; 5] = [
        Platform::YouTube,
        Platform::Instagram,
        Platform::TikTok,
        Platform::Twitter,
        Platform::Facebook,
    ];

    /// Classify a parsed URL by its host
    pub fn detect(url: &Url) -> Self {
        let host = url.host_str().unwrap_or_default().to_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);
        let host = host.strip_prefix("m.").unwrap_or(host);

        match host {
            "youtube.com" | "youtu.be" | "music.youtube.com" => Platform::YouTube,
            "instagram.com" => Platform::Instagram,
            "tiktok.com" | "vm.tiktok.com" | "vt.tiktok.com" => Platform::TikTok,
            "twitter.com" | "x.com" | "mobile.twitter.com" => Platform::Twitter,
            "facebook.com" | "fb.watch" => Platform::Facebook,
            _ => Platform::Other,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Platform::YouTube => "YouTube",
            Platform::Instagram => "Instagram",
            Platform::TikTok => "TikTok",
            Platform::Twitter => "Twitter/X",
            Platform::Facebook => "Facebook",
            Platform::Other => "Other",
        }
    }

    /// Example hosts for the `platforms` command
    pub fn hosts(&self) -> &'static str {
        match self {
            Platform::YouTube => "youtube.com, youtu.be",
            Platform::Instagram => "instagram.com",
            Platform::TikTok => "tiktok.com, vm.tiktok.com",
            Platform::Twitter => "twitter.com, x.com",
            Platform::Facebook => "facebook.com, fb.watch",
            Platform::Other => "any other site supported by yt-dlp",
        }
    }
}

/// Syntactic check: an http(s) URL with a host. No network access.
pub fn is_valid_url(url: &str) -> bool {
    validate_url(url).is_ok()
}

/// Parse and check a URL, naming the reason on rejection
pub fn validate_url(url: &str) -> Result<Url, PipelineError> {
    if url.trim().is_empty() {
        return Err(PipelineError::InvalidUrl("URL is empty".to_string()));
    }

    let parsed = Url::parse(url)
        .map_err(|e| PipelineError::InvalidUrl(format!("{}: {}", url, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(PipelineError::InvalidUrl(format!(
            "{}: URL must use HTTP or HTTPS protocol",
            url
        )));
    }

    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(parsed),
        _ => Err(PipelineError::InvalidUrl(format!("{}: URL has no host", url))),
    }
}
