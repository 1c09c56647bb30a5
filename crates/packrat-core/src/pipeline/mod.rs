//! Pipeline orchestration.
//!
//! A run moves through a fixed sequence of stages:
//!
//! ```text
//! NAMING -> BUILDING -> ENCRYPTING? -> RELOCATING? -> CLEANUP -> DONE
//!    \__________\____________\_____________\______________-> FAILED
//! ```
//!
//! A failure at any stage ends the run without entering later stages. The
//! most recent usable artifact is never deleted on failure; only a
//! half-written archive from BUILDING is removed.

pub mod cancel;
pub mod lock;
pub mod naming;
pub mod relocate;
pub mod state;

pub use cancel::CancelToken;
pub use lock::WorkdirLock;
pub use naming::ArtifactPaths;
pub use state::RunState;

use crate::AccessError;
use crate::PackratError;
use crate::ProgressCallback;
use crate::Result;
use crate::config::PipelineConfig;
use crate::creation::ArchiveBuilder;
use crate::creation::BuildReport;
use crate::creation::TreeWalker;
use crate::creation::zip::root_label;
use crate::encryption::Cipher;
use crate::encryption::CommandRunner;
use crate::encryption::SystemRunner;
use crate::report::CleanupFailure;
use crate::report::NoopProgress;
use crate::report::PipelineReport;
use chrono::Local;
use chrono::NaiveDateTime;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;
use thiserror::Error;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

/// At most this many failed paths are listed in the build summary log.
const MAX_LOGGED_FAILURES: usize = 10;

/// Stages of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Resolving the working folder and artifact names.
    Naming,
    /// Writing the archive.
    Building,
    /// Encrypting the archive.
    Encrypting,
    /// Copying the final artifact to the destination folder.
    Relocating,
    /// Removing intermediate artifacts.
    Cleanup,
    /// The run finished successfully.
    Done,
    /// The run failed.
    Failed,
}

impl Stage {
    /// Upper-case stage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Naming => "NAMING",
            Self::Building => "BUILDING",
            Self::Encrypting => "ENCRYPTING",
            Self::Relocating => "RELOCATING",
            Self::Cleanup => "CLEANUP",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed run: the stage that failed, why, and which artifact was kept.
#[derive(Error, Debug)]
#[error("{stage} failed: {error}")]
pub struct PipelineFailure {
    /// Stage that was running.
    pub stage: Stage,
    /// Underlying error.
    #[source]
    pub error: PackratError,
    /// The most recent usable artifact left on disk, if any.
    pub retained_artifact: Option<PathBuf>,
}

impl PipelineFailure {
    fn new(stage: Stage, error: PackratError, retained_artifact: Option<PathBuf>) -> Self {
        Self {
            stage,
            error,
            retained_artifact,
        }
    }
}

/// Runs one archive pipeline.
///
/// # Examples
///
/// ```no_run
/// use packrat_core::config::ConfigFile;
/// use packrat_core::pipeline::Pipeline;
///
/// let config = ConfigFile::load("backup.json".as_ref())?.validate()?;
/// let report = Pipeline::new(config, std::env::current_dir()?).run()?;
/// println!("archive at {}", report.final_path.display());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    work_dir: PathBuf,
    runner: Arc<dyn CommandRunner>,
    cipher: Option<Box<dyn Cipher>>,
    tool_timeout: Option<Duration>,
    cancel: CancelToken,
    timestamp: Option<NaiveDateTime>,
}

impl Pipeline {
    /// Creates a pipeline for `config`.
    ///
    /// `work_dir` is the default working folder: the archive is built
    /// there when no compression folder is configured, and relative paths
    /// in the configuration are resolved against it.
    pub fn new(config: PipelineConfig, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            work_dir: work_dir.into(),
            runner: Arc::new(SystemRunner),
            cipher: None,
            tool_timeout: None,
            cancel: CancelToken::new(),
            timestamp: None,
        }
    }

    /// Replaces the process runner used by the configured cipher.
    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Uses `cipher` instead of the one named by the configuration.
    #[must_use]
    pub fn with_cipher(mut self, cipher: Box<dyn Cipher>) -> Self {
        self.cipher = Some(cipher);
        self
    }

    /// Kills the encryption tool if it runs longer than `timeout`.
    #[must_use]
    pub fn with_tool_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.tool_timeout = timeout;
        self
    }

    /// Observes `token` for cancellation.
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Stamps the archive name with `at` instead of the current local time.
    #[must_use]
    pub fn with_timestamp(mut self, at: NaiveDateTime) -> Self {
        self.timestamp = Some(at);
        self
    }

    /// A handle that cancels this run.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Runs the pipeline to completion.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineFailure`] naming the failed stage, the cause,
    /// and the artifact left on disk.
    pub fn run(self) -> std::result::Result<PipelineReport, PipelineFailure> {
        self.run_with_progress(&mut NoopProgress)
    }

    /// Runs the pipeline, reporting stages and entries to `progress`.
    ///
    /// # Errors
    ///
    /// See [`Pipeline::run`].
    pub fn run_with_progress(
        self,
        progress: &mut dyn ProgressCallback,
    ) -> std::result::Result<PipelineReport, PipelineFailure> {
        let started = Instant::now();
        let mut state = RunState::new();
        let result = self.execute(&mut state, progress);

        let result = match result {
            Ok(mut report) => {
                report.duration = started.elapsed();
                info!(
                    path = %report.final_path.display(),
                    elapsed_ms = report.duration.as_millis() as u64,
                    "run complete"
                );
                Ok(report)
            }
            Err(failure) => {
                progress.on_stage(Stage::Failed);
                error!(stage = %failure.stage, error = %failure.error, "run failed");
                if let Some(kept) = &failure.retained_artifact {
                    info!(path = %kept.display(), "artifact retained");
                }
                Err(failure)
            }
        };
        progress.on_complete();
        result
    }

    fn execute(
        &self,
        state: &mut RunState,
        progress: &mut dyn ProgressCallback,
    ) -> std::result::Result<PipelineReport, PipelineFailure> {
        // NAMING
        progress.on_stage(Stage::Naming);
        let at_naming = |error| PipelineFailure::new(Stage::Naming, error, None);

        let work_dir = self.resolve_work_dir().map_err(at_naming)?;
        let _lock = WorkdirLock::acquire(&work_dir).map_err(at_naming)?;

        let default_cipher;
        let cipher: Option<&dyn Cipher> = match (&self.config.passphrase, &self.cipher) {
            (None, _) => None,
            (Some(_), Some(custom)) => Some(custom.as_ref()),
            (Some(_), None) => {
                default_cipher = self
                    .config
                    .encryption_method
                    .cipher(Arc::clone(&self.runner), self.tool_timeout);
                Some(default_cipher.as_ref())
            }
        };

        let file_name = naming::archive_file_name(
            &self.config.archive_prefix,
            self.config
                .timestamp
                .then(|| self.timestamp.unwrap_or_else(|| Local::now().naive_local())),
        );
        let destination = self
            .config
            .destination_folder
            .as_deref()
            .map(|folder| self.absolute(folder));
        let paths = ArtifactPaths::resolve(
            &work_dir,
            &file_name,
            cipher.map(|c| c.suffix()),
            destination.as_deref(),
        );
        paths.ensure_available().map_err(at_naming)?;
        info!(archive = %paths.archive.display(), "starting run");
        self.check_cancel(Stage::Naming, None)?;

        // BUILDING
        progress.on_stage(Stage::Building);
        state.begin(&paths.archive);
        let build = match self.build(&paths.archive, progress) {
            Ok(build) => build,
            Err(error) => {
                if let Some(partial) = state.take_in_progress() {
                    debug!(path = %partial.display(), "removing incomplete archive");
                    let _ = std::fs::remove_file(&partial);
                }
                return Err(PipelineFailure::new(Stage::Building, error, None));
            }
        };
        state.promote(&paths.archive);
        log_build_summary(&build);

        // ENCRYPTING
        if let (Some(cipher), Some(passphrase), Some(encrypted)) = (
            cipher,
            self.config.passphrase.as_ref(),
            paths.encrypted.as_deref(),
        ) {
            self.check_cancel(Stage::Encrypting, state.current())?;
            progress.on_stage(Stage::Encrypting);
            info!(method = %cipher.method(), output = %encrypted.display(), "encrypting archive");

            cipher
                .encrypt(&paths.archive, encrypted, passphrase)
                .map_err(|e| {
                    PipelineFailure::new(
                        Stage::Encrypting,
                        PackratError::Encryption(e),
                        Some(paths.archive.clone()),
                    )
                })?;
            state.promote(encrypted);
        }

        // RELOCATING
        let mut relocated = false;
        if let Some(destination) = paths.destination.as_deref() {
            let source = paths.final_local().to_path_buf();
            self.check_cancel(Stage::Relocating, Some(&source))?;
            progress.on_stage(Stage::Relocating);
            info!(from = %source.display(), to = %destination.display(), "relocating artifact");

            relocate::copy_new(&source, destination).map_err(|e| {
                PipelineFailure::new(
                    Stage::Relocating,
                    PackratError::Relocation {
                        destination: destination.to_path_buf(),
                        reason: e.to_string(),
                    },
                    Some(source.clone()),
                )
            })?;
            state.promote(destination);
            relocated = true;
        }

        // CLEANUP
        progress.on_stage(Stage::Cleanup);
        let mut report = PipelineReport {
            build,
            encrypted: cipher.is_some(),
            relocated,
            ..PipelineReport::default()
        };
        let intermediates = state.take_intermediates();
        if self.config.cleanup {
            for path in intermediates {
                match std::fs::remove_file(&path) {
                    Ok(()) => {
                        debug!(path = %path.display(), "removed intermediate artifact");
                        report.removed_intermediates.push(path);
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "failed to remove intermediate artifact");
                        report.cleanup_failures.push(CleanupFailure {
                            path,
                            reason: e.to_string(),
                        });
                    }
                }
            }
        } else {
            report.retained_intermediates = intermediates;
        }

        // DONE
        progress.on_stage(Stage::Done);
        let final_path = state
            .current()
            .map_or_else(|| paths.archive.clone(), Path::to_path_buf);
        report.final_path = final_path.canonicalize().unwrap_or(final_path);
        Ok(report)
    }

    /// Writes every existing target into the archive.
    fn build(&self, archive: &Path, progress: &mut dyn ProgressCallback) -> Result<BuildReport> {
        let mut builder = ArchiveBuilder::create(archive, self.config.compression_level)?;
        if let Some(folder) = archive.parent() {
            builder.skip_path(&folder.join(lock::LOCK_FILE_NAME));
        }

        let mut missing = Vec::new();
        for target in &self.config.target_paths {
            let target = self.absolute(target);
            if let Err(e) = std::fs::symlink_metadata(&target) {
                warn!(target = %target.display(), error = %e, "target path not accessible, skipping");
                missing.push(AccessError::new(&target, e.to_string()));
                continue;
            }

            let label = root_label(&target)?;
            info!(target = %target.display(), label = %label, "archiving target");
            let walker = TreeWalker::new(&target, self.config.follow_symlinks, &self.config.exclusions);
            builder.add_tree(&walker, &label, progress, &self.cancel)?;
        }

        if missing.len() == self.config.target_paths.len() {
            return Err(PackratError::NothingToArchive);
        }

        let (_file, mut report) = builder.finish()?;
        for err in missing {
            report.record_access_error(err);
        }
        Ok(report)
    }

    fn resolve_work_dir(&self) -> Result<PathBuf> {
        let dir = match &self.config.compression_folder {
            Some(folder) => {
                let folder = self.absolute(folder);
                std::fs::create_dir_all(&folder).map_err(|e| {
                    PackratError::config(format!(
                        "cannot create compression folder {}: {e}",
                        folder.display()
                    ))
                })?;
                folder
            }
            None => self.work_dir.clone(),
        };

        dir.canonicalize().map_err(|e| {
            PackratError::config(format!(
                "working folder {} is not accessible: {e}",
                dir.display()
            ))
        })
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.work_dir.join(path)
        }
    }

    fn check_cancel(
        &self,
        stage: Stage,
        retained: Option<&Path>,
    ) -> std::result::Result<(), PipelineFailure> {
        if self.cancel.is_cancelled() {
            return Err(PipelineFailure::new(
                stage,
                PackratError::Cancelled { stage },
                retained.map(Path::to_path_buf),
            ));
        }
        Ok(())
    }
}

fn log_build_summary(build: &BuildReport) {
    info!(
        files = build.files_added,
        directories = build.directories_added,
        symlinks = build.symlinks_added,
        excluded = build.entries_excluded,
        bytes = build.bytes_read,
        archive_size = build.archive_size,
        "archive built"
    );

    let failed = &build.access_errors;
    if failed.is_empty() {
        return;
    }
    warn!(count = failed.len(), "some entries could not be archived");
    for err in failed.iter().take(MAX_LOGGED_FAILURES) {
        warn!(path = %err.path.display(), reason = %err.reason, "not archived");
    }
    if failed.len() > MAX_LOGGED_FAILURES {
        warn!("... and {} more", failed.len() - MAX_LOGGED_FAILURES);
    }
}
