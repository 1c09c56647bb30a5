//! Output formatter trait for CLI results.

use anyhow::Result;
use packrat_core::PipelineConfig;
use packrat_core::PipelineReport;
use serde::Serialize;
use std::path::Path;

/// Common output formatter trait
pub trait OutputFormatter {
    /// Format the result of writing a configuration template
    fn format_init_result(&self, config_path: &Path) -> Result<()>;

    /// Format the result of validating a configuration
    fn format_validation_result(&self, config_path: &Path, config: &PipelineConfig) -> Result<()>;

    /// Format the result of a successful pipeline run
    fn format_run_result(&self, report: &PipelineReport) -> Result<()>;

    /// Format the result of a decryption
    fn format_decrypt_result(&self, output_path: &Path) -> Result<()>;

    /// Format error message
    fn format_error(&self, operation: &str, error: &anyhow::Error);
}

/// Generic JSON output structure
#[derive(Debug, Serialize)]
pub struct JsonOutput<T> {
    pub operation: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn success(operation: impl Into<String>, data: T) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Success,
            data: Some(data),
            error: None,
        }
    }
}

impl JsonOutput<()> {
    pub fn error(operation: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Error,
            data: None,
            error: Some(error.into()),
        }
    }
}
