//! Decrypt command implementation.

use super::load_config;
use crate::cli::DecryptArgs;
use crate::error::convert_decrypt_error;
use crate::output::OutputFormatter;
use anyhow::Result;
use packrat_core::Passphrase;
use packrat_core::decrypt_archive;
use packrat_core::encryption::SystemRunner;
use std::sync::Arc;
use std::time::Duration;

pub fn execute(args: &DecryptArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let config = load_config(&args.config, false)?;

    let method = args.method.unwrap_or(config.encryption_method);
    let cipher = method.cipher(
        Arc::new(SystemRunner),
        args.tool_timeout.map(Duration::from_secs),
    );
    // An unset passphrase is rejected by the cipher as empty
    let passphrase = config.passphrase.unwrap_or_else(|| Passphrase::new(""));

    let output = decrypt_archive(&args.archive, &passphrase, cipher.as_ref())
        .map_err(|e| convert_decrypt_error(e, &args.archive))?;
    formatter.format_decrypt_result(&output)
}
