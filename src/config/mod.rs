use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::fetcher::MediaFormat;
use crate::remote::PollOptions;
use crate::transcribe::DEFAULT_LANGUAGE;

/// Environment variable holding the Gemini API key
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Gemini API settings (the key itself comes from the environment)
    pub gemini: GeminiConfig,

    /// How long to wait for uploaded files to become usable
    pub polling: PollingConfig,

    /// External downloader settings
    pub downloader: DownloaderConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API root, without version
    pub base_url: String,

    /// Model used for transcription
    pub model: String,

    /// Timeout for a single transcription request
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingConfig {
    pub timeout_secs: u64,
    pub interval_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloaderConfig {
    /// yt-dlp executable
    pub program: String,

    /// Where downloads are written (current directory if unset)
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Language the transcript is requested in
    pub language: String,

    /// Format used when `--format` is not given
    pub default_format: MediaFormat,

    /// Delete local and remote copies when a run fails part-way
    pub cleanup_on_failure: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig {
                base_url: "https://generativelanguage.googleapis.com".to_string(),
                model: "gemini-1.5-flash".to_string(),
                request_timeout_secs: 600,
            },
            polling: PollingConfig {
                timeout_secs: 300,
                interval_secs: 5,
            },
            downloader: DownloaderConfig {
                program: "yt-dlp".to_string(),
                output_dir: None,
            },
            app: AppConfig {
                language: DEFAULT_LANGUAGE.to_string(),
                default_format: MediaFormat::Audio,
                cleanup_on_failure: false,
            },
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;
            let config = Self::from_yaml(&content)?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save().await?;
            Ok(config)
        }
    }

    /// Parse and validate YAML configuration
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config =
            serde_yaml::from_str(content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("media-transcriptor").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.gemini.model.trim().is_empty() {
            anyhow::bail!("Gemini model must be configured");
        }

        url::Url::parse(&self.gemini.base_url)
            .with_context(|| format!("Invalid Gemini base URL: {}", self.gemini.base_url))?;

        if self.polling.interval_secs == 0 {
            anyhow::bail!("Polling interval must be at least one second");
        }

        if self.gemini.request_timeout_secs == 0 {
            anyhow::bail!("Request timeout must be at least one second");
        }

        if self.downloader.program.trim().is_empty() {
            anyhow::bail!("Downloader program must be configured");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Gemini API: {}", self.gemini.base_url);
        println!("  Model: {}", self.gemini.model);
        println!("  Request Timeout: {}s", self.gemini.request_timeout_secs);
        println!(
            "  Polling: every {}s, up to {}s",
            self.polling.interval_secs, self.polling.timeout_secs
        );
        println!("  Downloader: {}", self.downloader.program);
        if let Some(dir) = &self.downloader.output_dir {
            println!("  Download Directory: {}", dir.display());
        }
        println!("  Language: {}", self.app.language);
        println!("  Default Format: {}", self.app.default_format);
        println!("  Cleanup On Failure: {}", self.app.cleanup_on_failure);
        println!(
            "  API Key: {}",
            if std::env::var_os(API_KEY_ENV).is_some() {
                "set"
            } else {
                "not set"
            }
        );
    }

    pub fn poll_options(&self) -> PollOptions {
        PollOptions {
            timeout: Duration::from_secs(self.polling.timeout_secs),
            interval: Duration::from_secs(self.polling.interval_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.gemini.request_timeout_secs)
    }

    /// Download directory, falling back to the working directory
    pub fn output_dir(&self) -> PathBuf {
        self.downloader
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_documented_limits() {
        let config = Config::default();
        assert_eq!(config.poll_options(), PollOptions::default());
        assert_eq!(config.request_timeout(), Duration::from_secs(600));
        assert_eq!(config.output_dir(), PathBuf::from("."));
        assert!(!config.app.cleanup_on_failure);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_round_trip_keeps_values() {
        let mut config = Config::default();
        config.app.default_format = MediaFormat::Video;
        config.downloader.output_dir = Some(PathBuf::from("/tmp/media"));

        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("default_format: video"));
        assert_eq!(Config::from_yaml(&yaml).unwrap(), config);
    }

    #[test]
    fn test_rejects_zero_interval() {
        let mut config = Config::default();
        config.polling.interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let mut config = Config::default();
        config.gemini.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_section_fails_to_parse() {
        assert!(Config::from_yaml("gemini:\n  model: x\n").is_err());
    }
}
