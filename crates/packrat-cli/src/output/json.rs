//! JSON output formatter for machine-readable results.

use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;
use anyhow::Result;
use packrat_core::PipelineConfig;
use packrat_core::PipelineReport;
use serde::Serialize;
use std::io::Write;
use std::io::{self};
use std::path::Path;

pub struct JsonFormatter;

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }
}

fn display_paths(paths: &[std::path::PathBuf]) -> Vec<String> {
    paths.iter().map(|p| p.display().to_string()).collect()
}

impl OutputFormatter for JsonFormatter {
    fn format_init_result(&self, config_path: &Path) -> Result<()> {
        #[derive(Serialize)]
        struct InitOutput {
            config_path: String,
        }

        let data = InitOutput {
            config_path: config_path.display().to_string(),
        };
        Self::output(&JsonOutput::success("init", data))
    }

    fn format_validation_result(&self, config_path: &Path, config: &PipelineConfig) -> Result<()> {
        #[derive(Serialize)]
        struct ValidationOutput {
            config_path: String,
            target_paths: Vec<String>,
            destination_folder: Option<String>,
            compression_folder: Option<String>,
            encrypted: bool,
            encryption_method: String,
            compression_level: u8,
            exclusion_patterns: usize,
            cleanup: bool,
            follow_symlinks: bool,
        }

        let data = ValidationOutput {
            config_path: config_path.display().to_string(),
            target_paths: display_paths(&config.target_paths),
            destination_folder: config
                .destination_folder
                .as_ref()
                .map(|p| p.display().to_string()),
            compression_folder: config
                .compression_folder
                .as_ref()
                .map(|p| p.display().to_string()),
            encrypted: config.encrypts(),
            encryption_method: config.encryption_method.to_string(),
            compression_level: config.compression_level.get(),
            exclusion_patterns: config.exclusions.len(),
            cleanup: config.cleanup,
            follow_symlinks: config.follow_symlinks,
        };
        Self::output(&JsonOutput::success("validate", data))
    }

    fn format_run_result(&self, report: &PipelineReport) -> Result<()> {
        #[derive(Serialize)]
        struct RunOutput {
            final_path: String,
            encrypted: bool,
            relocated: bool,
            targets_archived: usize,
            files_added: usize,
            directories_added: usize,
            symlinks_added: usize,
            entries_excluded: usize,
            bytes_read: u64,
            archive_size: u64,
            access_errors: Vec<String>,
            removed_intermediates: Vec<String>,
            retained_intermediates: Vec<String>,
            cleanup_failures: Vec<String>,
            duration_ms: u128,
        }

        let build = &report.build;
        let data = RunOutput {
            final_path: report.final_path.display().to_string(),
            encrypted: report.encrypted,
            relocated: report.relocated,
            targets_archived: build.targets_archived,
            files_added: build.files_added,
            directories_added: build.directories_added,
            symlinks_added: build.symlinks_added,
            entries_excluded: build.entries_excluded,
            bytes_read: build.bytes_read,
            archive_size: build.archive_size,
            access_errors: build.access_errors.iter().map(ToString::to_string).collect(),
            removed_intermediates: display_paths(&report.removed_intermediates),
            retained_intermediates: display_paths(&report.retained_intermediates),
            cleanup_failures: report
                .cleanup_failures
                .iter()
                .map(|f| format!("{}: {}", f.path.display(), f.reason))
                .collect(),
            duration_ms: report.duration.as_millis(),
        };
        Self::output(&JsonOutput::success("run", data))
    }

    fn format_decrypt_result(&self, output_path: &Path) -> Result<()> {
        #[derive(Serialize)]
        struct DecryptOutput {
            output_path: String,
        }

        let data = DecryptOutput {
            output_path: output_path.display().to_string(),
        };
        Self::output(&JsonOutput::success("decrypt", data))
    }

    fn format_error(&self, operation: &str, error: &anyhow::Error) {
        let output = JsonOutput::error(operation, format!("{error:#}"));
        let _ = Self::output(&output);
    }
}
