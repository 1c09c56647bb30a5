//! Packrat CLI - Command-line utility for filtered, encrypted backup
//! archives.

mod cli;
mod commands;
mod error;
mod output;
mod progress;

use anyhow::Result;
use clap::Parser;
use output::OutputFormatter;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    init_logging(cli.verbose, cli.quiet);
    let formatter = output::create_formatter(cli.json, cli.verbose, cli.quiet);

    let result = dispatch(&cli, &*formatter);
    if cli.json
        && let Err(err) = &result
    {
        formatter.format_error(operation_name(&cli.command), err);
    }
    result
}

fn dispatch(cli: &cli::Cli, formatter: &dyn OutputFormatter) -> Result<()> {
    match &cli.command {
        cli::Commands::Init(args) => commands::init::execute(args, formatter),
        cli::Commands::Validate(args) => commands::validate::execute(args, formatter),
        cli::Commands::Run(args) => {
            commands::run::execute(args, formatter, !cli.quiet && !cli.json)
        }
        cli::Commands::Decrypt(args) => commands::decrypt::execute(args, formatter),
        cli::Commands::Completion(args) => {
            commands::completion::execute(args.shell);
            Ok(())
        }
    }
}

const fn operation_name(command: &cli::Commands) -> &'static str {
    match command {
        cli::Commands::Init(_) => "init",
        cli::Commands::Validate(_) => "validate",
        cli::Commands::Run(_) => "run",
        cli::Commands::Decrypt(_) => "decrypt",
        cli::Commands::Completion(_) => "completion",
    }
}

/// Logs go to stderr so stdout stays clean for results and JSON.
/// `RUST_LOG` overrides the level chosen by `--verbose`/`--quiet`.
fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if quiet {
        "warn"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
