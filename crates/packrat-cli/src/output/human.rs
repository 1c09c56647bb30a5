//! Human-readable output formatter with colors and styling.

use super::formatter::OutputFormatter;
use anyhow::Result;
use console::Term;
use console::style;
use packrat_core::PipelineConfig;
use packrat_core::PipelineReport;
use std::path::Path;
use std::time::Duration;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
        }
    }

    fn format_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.1} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.1} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.1} KB", bytes as f64 / KB as f64)
        } else {
            format!("{bytes} B")
        }
    }

    fn format_number(n: usize) -> String {
        let s = n.to_string();
        let mut result = String::new();
        let mut count = 0;

        for c in s.chars().rev() {
            if count == 3 {
                result.push(',');
                count = 0;
            }
            result.push(c);
            count += 1;
        }

        result.chars().rev().collect()
    }

    fn line(&self, text: &str) {
        let _ = self.term.write_line(text);
    }

    fn headline(&self, text: &str) {
        if self.use_colors {
            self.line(&format!("{} {text}", style("✓").green().bold()));
        } else {
            self.line(text);
        }
    }

    fn section(&self, title: &str) {
        self.line("");
        if self.use_colors {
            self.line(&format!("{}", style(title).yellow().bold()));
        } else {
            self.line(title);
        }
    }
}

/// Spells out a duration: "2 hours, 1 minute, and 1 second".
///
/// Sub-second durations are shown with millisecond precision.
pub fn duration_in_words(duration: Duration) -> String {
    let total = duration.as_secs();
    let units = [
        (total / 3600, "hour", "hours"),
        (total / 60 % 60, "minute", "minutes"),
        (total % 60, "second", "seconds"),
    ];

    let parts: Vec<String> = units
        .iter()
        .filter(|(n, _, _)| *n > 0)
        .map(|&(n, one, many)| format!("{n} {}", if n == 1 { one } else { many }))
        .collect();

    match parts.as_slice() {
        [] => format!("{:.3} seconds", duration.as_secs_f64()),
        [only] => only.clone(),
        [init @ .., last] => format!("{}, and {last}", init.join(", ")),
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_init_result(&self, config_path: &Path) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        self.headline(&format!(
            "Configuration template written: {}",
            config_path.display()
        ));
        self.line("  Edit 'target_paths' before running a backup.");
        Ok(())
    }

    fn format_validation_result(&self, config_path: &Path, config: &PipelineConfig) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        self.headline(&format!("Configuration valid: {}", config_path.display()));

        if self.verbose {
            for target in &config.target_paths {
                self.line(&format!("  Target:           {}", target.display()));
            }
            if let Some(dest) = &config.destination_folder {
                self.line(&format!("  Destination:      {}", dest.display()));
            }
            let encryption = if config.encrypts() {
                config.encryption_method.as_str()
            } else {
                "off"
            };
            self.line(&format!("  Encryption:       {encryption}"));
            self.line(&format!("  Compression:      {}", config.compression_level));
            self.line(&format!("  Exclusions:       {}", config.exclusions.len()));
        }

        Ok(())
    }

    fn format_run_result(&self, report: &PipelineReport) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        let build = &report.build;
        self.headline(&format!("Backup complete: {}", report.final_path.display()));
        self.line("");
        self.line(&format!(
            "  Files added:      {}",
            Self::format_number(build.files_added)
        ));
        self.line(&format!(
            "  Directories:      {}",
            Self::format_number(build.directories_added)
        ));
        self.line(&format!(
            "  Total size:       {}",
            Self::format_size(build.bytes_read)
        ));
        self.line(&format!(
            "  Archive size:     {}",
            Self::format_size(build.archive_size)
        ));
        if build.entries_excluded > 0 {
            self.line(&format!(
                "  Excluded:         {}",
                Self::format_number(build.entries_excluded)
            ));
        }
        self.line(&format!(
            "  Encrypted:        {}",
            if report.encrypted { "yes" } else { "no" }
        ));
        self.line(&format!(
            "  Elapsed:          {}",
            duration_in_words(report.duration)
        ));

        if self.verbose {
            self.line(&format!("  Symlinks:         {}", build.symlinks_added));
            self.line(&format!(
                "  Compression:      {:.1}%",
                build.compression_percentage()
            ));
            for path in &report.removed_intermediates {
                self.line(&format!("  Removed:          {}", path.display()));
            }
        }

        if build.has_access_errors() {
            self.section("Skipped (unreadable):");
            for err in &build.access_errors {
                self.line(&format!("  - {err}"));
            }
        }

        if !report.retained_intermediates.is_empty() {
            self.section("Intermediate files kept:");
            for path in &report.retained_intermediates {
                self.line(&format!("  - {}", path.display()));
            }
        }

        if report.has_cleanup_failures() {
            self.section("Cleanup failed:");
            for failure in &report.cleanup_failures {
                self.line(&format!("  - {}: {}", failure.path.display(), failure.reason));
            }
        }

        Ok(())
    }

    fn format_decrypt_result(&self, output_path: &Path) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        self.headline(&format!("Decrypted: {}", output_path.display()));
        Ok(())
    }

    fn format_error(&self, _operation: &str, _error: &anyhow::Error) {
        // Reported on stderr when main returns the error
    }
}
