//! Spinner for pipeline runs.

use console::Term;
use indicatif::HumanBytes;
use indicatif::ProgressBar;
use indicatif::ProgressStyle;
use packrat_core::ProgressCallback;
use packrat_core::Stage;
use std::time::Duration;

/// CLI spinner implementing `ProgressCallback`.
///
/// The total member count is unknown while the tree is walked lazily, so
/// this shows a spinner with the running count, bytes read, and the current
/// stage or member. Cleans up on drop.
pub struct CliProgress {
    bar: ProgressBar,
    bytes_read: u64,
    members: usize,
}

impl CliProgress {
    /// Creates a new spinner.
    #[must_use]
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {prefix:.bold} {pos} entries {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(120));

        Self {
            bar,
            bytes_read: 0,
            members: 0,
        }
    }

    /// Checks if we should show progress (TTY detection).
    #[must_use]
    pub fn should_show() -> bool {
        Term::stderr().is_term()
    }
}

impl Default for CliProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressCallback for CliProgress {
    fn on_stage(&mut self, stage: Stage) {
        let label = match stage {
            Stage::Naming => "Preparing",
            Stage::Building => "Archiving",
            Stage::Encrypting => "Encrypting",
            Stage::Relocating => "Relocating",
            Stage::Cleanup => "Cleaning up",
            Stage::Done | Stage::Failed => "Finished",
        };
        self.bar.set_prefix(label);
        if stage != Stage::Building {
            self.bar.set_message("");
        }
    }

    fn on_entry_start(&mut self, member: &str, current: usize) {
        self.members = current;
        self.bar
            .set_message(format!("({}) {member}", HumanBytes(self.bytes_read)));
    }

    fn on_bytes_written(&mut self, bytes: u64) {
        self.bytes_read += bytes;
    }

    fn on_entry_complete(&mut self, _member: &str) {
        self.bar.set_position(self.members as u64);
    }

    fn on_complete(&mut self) {
        self.bar.finish_and_clear();
    }
}
