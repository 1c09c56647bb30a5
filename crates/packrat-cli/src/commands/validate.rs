//! Validate command implementation.

use super::load_config;
use crate::cli::ValidateArgs;
use crate::output::OutputFormatter;
use anyhow::Result;
use tracing::info;

pub fn execute(args: &ValidateArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let config = load_config(&args.config, false)?;
    info!(config = %args.config.display(), "configuration validated");
    formatter.format_validation_result(&args.config, &config)
}
