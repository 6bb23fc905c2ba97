//! Terminal progress display fed by coordinator events.

use indicatif::{ProgressBar, ProgressStyle};
use packup::download::QueueStatus;
use packup::CoordinatorEvent;

/// Resolution of the overall bar.
const BAR_UNITS: u64 = 1000;

/// Single overall progress bar with per-queue status lines.
pub struct UpdateProgress {
    bar: ProgressBar,
}

impl UpdateProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(BAR_UNITS);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        Self { bar }
    }

    /// Update the display for one event.
    pub fn handle(&self, event: &CoordinatorEvent) {
        match event {
            CoordinatorEvent::Progress { queue, overall, .. } => {
                self.bar.set_position(to_units(*overall));
                self.bar.set_message(queue.clone());
            }
            CoordinatorEvent::QueueFinished {
                name,
                status,
                failures,
            } => {
                if *status == QueueStatus::Failed {
                    self.bar
                        .println(format!("✗ {} ({} file(s) failed)", name, failures.len()));
                    for failure in failures {
                        self.bar.println(format!("    {}", failure));
                    }
                } else {
                    self.bar.println(format!("✓ {}", name));
                }
            }
            CoordinatorEvent::AllComplete(summary) => {
                if summary.is_success() {
                    self.bar.set_position(BAR_UNITS);
                }
                self.bar.finish_and_clear();
            }
        }
    }
}

fn to_units(fraction: f64) -> u64 {
    (fraction.clamp(0.0, 1.0) * BAR_UNITS as f64).round() as u64
}
