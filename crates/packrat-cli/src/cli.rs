//! CLI argument parsing using clap.

use clap::Parser;
use clap::Subcommand;
use clap_complete::Shell;
use packrat_core::EncryptionMethod;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "packrat")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default configuration file
    Init(InitArgs),
    /// Check a configuration file without touching any files
    Validate(ValidateArgs),
    /// Archive, encrypt and relocate the configured targets
    Run(RunArgs),
    /// Decrypt an encrypted archive
    Decrypt(DecryptArgs),
    /// Generate shell completions
    Completion(CompletionArgs),
}

#[derive(clap::Args)]
pub struct InitArgs {
    /// Path of the configuration file to create (`.json` is appended if
    /// missing)
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,
}

#[derive(clap::Args)]
pub struct ValidateArgs {
    /// Path to the configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,
}

#[derive(clap::Args)]
pub struct RunArgs {
    /// Path to the configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Traverse symlinked directories, overriding the configuration
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Kill the encryption tool after this many seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub tool_timeout: Option<u64>,
}

#[derive(clap::Args)]
pub struct DecryptArgs {
    /// Configuration file holding the passphrase
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Encrypted archive to decrypt
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Decryption tool (default: the configured method)
    #[arg(long, value_name = "METHOD", value_parser = parse_method)]
    pub method: Option<EncryptionMethod>,

    /// Kill the decryption tool after this many seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub tool_timeout: Option<u64>,
}

#[derive(clap::Args)]
pub struct CompletionArgs {
    /// Target shell
    #[arg(value_name = "SHELL")]
    pub shell: Shell,
}

/// Parse an encryption method name (`openssl` or `gpg`, any case)
fn parse_method(s: &str) -> Result<EncryptionMethod, String> {
    s.parse().map_err(|_| format!("unknown method '{s}' (expected openssl or gpg)"))
}
