//! Init command implementation.

use crate::cli::InitArgs;
use crate::error::convert_config_error;
use crate::output::OutputFormatter;
use anyhow::Result;
use packrat_core::ConfigFile;

pub fn execute(args: &InitArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let written =
        ConfigFile::write_template(&args.config).map_err(|e| convert_config_error(e, &args.config))?;
    formatter.format_init_result(&written)
}
