//! Per-run artifact bookkeeping.

use std::path::Path;
use std::path::PathBuf;

/// Artifacts of one run, owned by the orchestrator.
///
/// `current` is always the most recent usable artifact: the archive after
/// BUILDING, the encrypted file after ENCRYPTING, the destination copy
/// after RELOCATING. Superseded artifacts move to `intermediates`.
#[derive(Debug, Default)]
pub struct RunState {
    in_progress: Option<PathBuf>,
    current: Option<PathBuf>,
    intermediates: Vec<PathBuf>,
}

impl RunState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an artifact that is being written and is not usable yet.
    pub fn begin(&mut self, path: &Path) {
        self.in_progress = Some(path.to_path_buf());
    }

    /// Takes the unfinished artifact, if any, for removal.
    pub fn take_in_progress(&mut self) -> Option<PathBuf> {
        self.in_progress.take()
    }

    /// Promotes a finished artifact to current. The previous current
    /// artifact, if any, becomes an intermediate.
    pub fn promote(&mut self, path: &Path) {
        if self.in_progress.as_deref() == Some(path) {
            self.in_progress = None;
        }
        if let Some(previous) = self.current.replace(path.to_path_buf()) {
            self.intermediates.push(previous);
        }
    }

    /// The most recent usable artifact.
    #[must_use]
    pub fn current(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    /// Artifacts that have been superseded.
    #[must_use]
    pub fn intermediates(&self) -> &[PathBuf] {
        &self.intermediates
    }

    /// Takes the intermediates for cleanup.
    pub fn take_intermediates(&mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.intermediates)
    }
}
