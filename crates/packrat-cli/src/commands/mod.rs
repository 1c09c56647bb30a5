//! Subcommand implementations.

pub mod completion;
pub mod decrypt;
pub mod init;
pub mod run;
pub mod validate;

use crate::error::convert_config_error;
use anyhow::Result;
use packrat_core::ConfigFile;
use packrat_core::PipelineConfig;
use std::path::Path;

/// Loads and validates a configuration file, applying the symlink override
/// first when it is set.
fn load_config(path: &Path, follow_symlinks: bool) -> Result<PipelineConfig> {
    let mut file = ConfigFile::load(path).map_err(|e| convert_config_error(e, path))?;
    if follow_symlinks {
        file = file.with_follow_symlinks(true);
    }
    file.validate().map_err(|e| convert_config_error(e, path))
}
