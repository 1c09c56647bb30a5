//! Pipeline run reporting and progress callbacks.

use crate::creation::BuildReport;
use crate::pipeline::Stage;
use std::path::PathBuf;
use std::time::Duration;

/// Outcome of a successful pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    /// Absolute path of the final artifact.
    pub final_path: PathBuf,

    /// Statistics of the archive build.
    pub build: BuildReport,

    /// Whether the archive was encrypted.
    pub encrypted: bool,

    /// Whether the artifact was copied to the destination folder.
    pub relocated: bool,

    /// Intermediate artifacts deleted by the cleanup stage.
    pub removed_intermediates: Vec<PathBuf>,

    /// Intermediate artifacts left on disk (cleanup disabled or failed).
    pub retained_intermediates: Vec<PathBuf>,

    /// Intermediate artifacts that could not be deleted.
    pub cleanup_failures: Vec<CleanupFailure>,

    /// Wall-clock duration of the whole run.
    pub duration: Duration,
}

impl PipelineReport {
    /// Returns whether cleanup left something behind that it tried to
    /// remove.
    #[must_use]
    pub fn has_cleanup_failures(&self) -> bool {
        !self.cleanup_failures.is_empty()
    }
}

/// An intermediate artifact that the cleanup stage failed to delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupFailure {
    /// The artifact that is still on disk.
    pub path: PathBuf,
    /// Why deletion failed.
    pub reason: String,
}

/// Callback trait for progress reporting during a pipeline run.
///
/// Implement this trait to receive stage transitions and per-entry
/// updates, e.g. to drive a progress bar.
///
/// # Examples
///
/// ```
/// use packrat_core::ProgressCallback;
/// use packrat_core::pipeline::Stage;
///
/// struct LogProgress;
///
/// impl ProgressCallback for LogProgress {
///     fn on_stage(&mut self, stage: Stage) {
///         println!("stage: {stage}");
///     }
///
///     fn on_entry_start(&mut self, member: &str, current: usize) {
///         println!("[{current}] {member}");
///     }
///
///     fn on_bytes_written(&mut self, _bytes: u64) {}
///
///     fn on_entry_complete(&mut self, _member: &str) {}
///
///     fn on_complete(&mut self) {}
/// }
/// ```
pub trait ProgressCallback: Send {
    /// Called when the pipeline enters a stage.
    fn on_stage(&mut self, stage: Stage);

    /// Called before an archive member is written.
    ///
    /// # Arguments
    ///
    /// * `member` - Archive-relative member name
    /// * `current` - Running member count (1-indexed); the total is not
    ///   known up front because traversal is lazy
    fn on_entry_start(&mut self, member: &str, current: usize);

    /// Called for each chunk of source data copied into the archive.
    fn on_bytes_written(&mut self, bytes: u64);

    /// Called after a member has been written.
    fn on_entry_complete(&mut self, member: &str);

    /// Called once when the run finishes, successfully or not.
    fn on_complete(&mut self);
}

/// No-op implementation of `ProgressCallback`.
#[derive(Debug, Default)]
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {
    fn on_stage(&mut self, _stage: Stage) {}

    fn on_entry_start(&mut self, _member: &str, _current: usize) {}

    fn on_bytes_written(&mut self, _bytes: u64) {}

    fn on_entry_complete(&mut self, _member: &str) {}

    fn on_complete(&mut self) {}
}
