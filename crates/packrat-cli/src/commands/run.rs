//! Run command implementation.

use super::load_config;
use crate::cli::RunArgs;
use crate::error::convert_pipeline_failure;
use crate::output::OutputFormatter;
use crate::progress::CliProgress;
use anyhow::Context;
use anyhow::Result;
use packrat_core::CancelToken;
use packrat_core::Pipeline;
use std::env;
use std::time::Duration;
use tracing::warn;

pub fn execute(args: &RunArgs, formatter: &dyn OutputFormatter, show_progress: bool) -> Result<()> {
    let config = load_config(&args.config, args.follow_symlinks)?;
    let work_dir = env::current_dir().context("failed to get current directory")?;

    let pipeline = Pipeline::new(config, work_dir)
        .with_tool_timeout(args.tool_timeout.map(Duration::from_secs));
    install_interrupt_handler(pipeline.cancel_token());

    // Use the spinner only on a terminal (not quiet, not JSON)
    let result = if show_progress && CliProgress::should_show() {
        let mut progress = CliProgress::new();
        pipeline.run_with_progress(&mut progress)
    } else {
        pipeline.run()
    };

    let report = result.map_err(convert_pipeline_failure)?;
    formatter.format_run_result(&report)
}

/// Cancels the run on Ctrl-C; the pipeline stops at the next entry or
/// stage boundary and cleans up its partial archive.
fn install_interrupt_handler(token: CancelToken) {
    if let Err(err) = ctrlc::set_handler(move || {
        warn!("interrupt received, cancelling run");
        token.cancel();
    }) {
        warn!(error = %err, "failed to install Ctrl-C handler");
    }
}
