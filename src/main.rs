use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use transcriptor::cli::{Cli, Commands, SpinnerProgress};
use transcriptor::config::{Config, API_KEY_ENV};
use transcriptor::fetcher::{MediaRequest, Platform, YtDlpDownloader};
use transcriptor::output::{self, TranscriptReport};
use transcriptor::remote::GeminiClient;
use transcriptor::{utils, Transcriber, TranscriptionPipeline};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "transcriptor=debug"
    } else {
        "transcriptor=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Transcribe {
            url,
            format,
            language,
            output,
            output_format,
            timeout,
            poll_interval,
            cleanup_on_failure,
            api_key,
        } => {
            // The key is read once here and handed to the client
            let api_key = api_key
                .filter(|key| !key.trim().is_empty())
                .with_context(|| {
                    format!("API key not found. Set {} or pass --api-key.", API_KEY_ENV)
                })?;

            let mut config = Config::load().await?;
            if let Some(secs) = timeout {
                config.polling.timeout_secs = secs;
            }
            if let Some(secs) = poll_interval {
                config.polling.interval_secs = secs;
            }
            if let Some(language) = language {
                config.app.language = language;
            }
            config.app.cleanup_on_failure |= cleanup_on_failure;
            config.validate()?;

            let media_format = format.unwrap_or(config.app.default_format);

            // Check for required external dependencies (non-fatal)
            let missing_deps =
                utils::check_dependencies(&config.downloader.program, media_format).await;
            if !missing_deps.is_empty() {
                eprintln!("⚠️  Dependency check warnings:");
                for dep in missing_deps {
                    eprintln!("   • {}", dep);
                }
                eprintln!("   (Continuing anyway - tools may be available)");
            }

            let service = GeminiClient::new(&config.gemini, api_key)
                .context("Failed to create Gemini client")?;
            let downloader =
                YtDlpDownloader::new(config.downloader.program.clone(), config.output_dir());
            let transcriber =
                Transcriber::new(config.app.language.clone(), config.request_timeout());
            let pipeline =
                TranscriptionPipeline::new(downloader, service, transcriber, config.poll_options())
                    .with_cleanup_on_failure(config.app.cleanup_on_failure);

            let request = MediaRequest::new(url, media_format);
            let progress = SpinnerProgress::new(cli.quiet);
            let started = std::time::Instant::now();

            let result = pipeline.run(&request, &progress).await;
            progress.finish();
            let result = result?;

            tracing::info!("Finished in {}", utils::format_duration(started.elapsed()));

            let report = TranscriptReport::new(&request, &config.app.language, &result);
            match output {
                Some(path) => {
                    output::save_to_file(&report, &path, &output_format).await?;
                    println!("Transcript saved to: {}", path.display());
                }
                None => {
                    output::print_to_console(&report, &output_format)?;
                }
            }
        }
        Commands::Config { show } => {
            let config = Config::load().await?;
            if show {
                config.display();
            } else {
                println!("Edit the config file to change settings:");
                println!("  {}", Config::config_path()?.display());
            }
        }
        Commands::Platforms => {
            println!("Supported platforms:");
            for platform in Platform::KNOWN {
                println!("  • {} ({})", platform.name(), platform.hosts());
            }
            println!("  • {}", Platform::Other.hosts());
        }
    }

    Ok(())
}
