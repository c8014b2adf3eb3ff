use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::pipeline::{PipelineStage, ProgressObserver};
use crate::remote::PollProgress;
use crate::utils::format_countdown;
use crate::CleanupWarning;

/// Terminal spinner that follows a pipeline run
pub struct SpinnerProgress {
    bar: ProgressBar,
}

impl SpinnerProgress {
    pub fn new(quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        };

        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Message shown while waiting for the remote file
pub fn poll_message(progress: &PollProgress) -> String {
    format!(
        "Time remaining: {} | File status: {} (check #{})",
        format_countdown(progress.remaining),
        progress.status,
        progress.poll
    )
}

impl ProgressObserver for SpinnerProgress {
    fn on_stage(&self, stage: PipelineStage) {
        match stage {
            PipelineStage::Done => self.bar.finish_with_message("Transcript ready"),
            stage => self.bar.set_message(format!("{}...", stage)),
        }
    }

    fn on_poll(&self, progress: &PollProgress) {
        self.bar.set_message(poll_message(progress));
    }

    fn on_warning(&self, warning: &CleanupWarning) {
        self.bar
            .println(format!("{} {}", style("warning:").yellow().bold(), warning));
    }
}
