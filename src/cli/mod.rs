use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::fetcher::MediaFormat;

pub mod progress;

pub use progress::SpinnerProgress;

#[derive(Parser)]
#[command(
    name = "transcriptor",
    about = "Media Transcriptor - Transcribe YouTube, Instagram, TikTok and other posts using Gemini",
    version,
    long_about = "Downloads a social-media post with yt-dlp, uploads it to the Gemini File API, waits until the file is ready and prints the transcript. Local and remote copies are deleted afterwards."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Transcribe a post from a URL
    Transcribe {
        /// Post URL (YouTube, Instagram, TikTok, Twitter/X, or any site yt-dlp supports)
        #[arg(value_name = "URL")]
        url: String,

        /// What to download: audio for a quick transcript, video for visual context
        #[arg(short, long, value_enum)]
        format: Option<MediaFormat>,

        /// Language to transcribe into (defaults to the configured language)
        #[arg(short, long, value_name = "LANG")]
        language: Option<String>,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        output_format: OutputFormat,

        /// Seconds to wait for the uploaded file to become ACTIVE
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Seconds between status checks
        #[arg(long, value_name = "SECS")]
        poll_interval: Option<u64>,

        /// Delete local and remote copies even when the run fails
        #[arg(long)]
        cleanup_on_failure: bool,

        /// Gemini API key
        #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },

    /// Show or locate the configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },

    /// List supported platforms
    Platforms,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    /// Transcript text only
    Text,
    /// JSON with request details
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
