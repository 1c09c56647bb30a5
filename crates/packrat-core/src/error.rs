//! Error types for the archive pipeline.

use crate::encryption::CipherError;
use crate::pipeline::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `PackratError`.
pub type Result<T> = std::result::Result<T, PackratError>;

/// A file-system entry that could not be read during traversal.
///
/// Access errors are collected per entry and never abort a walk on their
/// own; the affected entry is skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot access {path}: {reason}")]
pub struct AccessError {
    /// The entry that could not be read.
    pub path: PathBuf,
    /// Human-readable cause (usually the underlying I/O error).
    pub reason: String,
}

impl AccessError {
    /// Creates an access error for `path`.
    pub fn new(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Errors that can occur while selecting, archiving, encrypting or
/// relocating files.
#[derive(Error, Debug)]
pub enum PackratError {
    /// Configuration value is invalid; raised before any traversal.
    #[error("invalid configuration: {reason}")]
    Config {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// A single entry could not be read; the walk continues without it.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// The walk cannot continue (for example a symlink cycle).
    #[error("traversal failed at {path}: {reason}")]
    Traversal {
        /// Entry where traversal stopped.
        path: PathBuf,
        /// Why traversal stopped.
        reason: String,
    },

    /// Reading a source file or writing the container failed.
    #[error("failed to build archive {archive}: {reason}")]
    Build {
        /// Archive being written.
        archive: PathBuf,
        /// Underlying cause.
        reason: String,
    },

    /// None of the configured target paths exist.
    #[error("none of the configured target paths exist")]
    NothingToArchive,

    /// A pipeline output path is already taken.
    #[error("refusing to overwrite existing file: {path}")]
    AlreadyExists {
        /// The existing file.
        path: PathBuf,
    },

    /// Another run holds the working-folder lock.
    #[error("working folder {folder} is in use by another run")]
    Busy {
        /// The locked working folder.
        folder: PathBuf,
    },

    /// External encryption failed.
    #[error("encryption failed: {0}")]
    Encryption(#[source] CipherError),

    /// External decryption failed.
    #[error("decryption failed: {0}")]
    Decryption(#[source] CipherError),

    /// The final artifact could not be copied to the destination folder.
    #[error("failed to relocate archive to {destination}: {reason}")]
    Relocation {
        /// Intended destination file.
        destination: PathBuf,
        /// Underlying cause.
        reason: String,
    },

    /// The run was cancelled by the caller.
    #[error("run cancelled during {stage}")]
    Cancelled {
        /// Stage that was active when cancellation was observed.
        stage: Stage,
    },

    /// I/O operation failed outside of a more specific stage context.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PackratError {
    /// Creates a configuration error.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Returns `true` if the error only affects a single entry and the
    /// surrounding operation may continue.
    ///
    /// # Examples
    ///
    /// ```
    /// use packrat_core::AccessError;
    /// use packrat_core::PackratError;
    ///
    /// let err = PackratError::from(AccessError::new("/data/locked", "permission denied"));
    /// assert!(err.is_recoverable());
    ///
    /// let err = PackratError::NothingToArchive;
    /// assert!(!err.is_recoverable());
    /// ```
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Access(_))
    }

    /// Returns the pipeline stage this kind of error belongs to, if any.
    ///
    /// `Io` and `Access` errors carry no stage of their own; the
    /// orchestrator attributes them to whichever stage was running.
    #[must_use]
    pub const fn stage(&self) -> Option<Stage> {
        match self {
            Self::Config { .. } | Self::AlreadyExists { .. } | Self::Busy { .. } => {
                Some(Stage::Naming)
            }
            Self::Traversal { .. } | Self::Build { .. } | Self::NothingToArchive => {
                Some(Stage::Building)
            }
            Self::Encryption(_) | Self::Decryption(_) => Some(Stage::Encrypting),
            Self::Relocation { .. } => Some(Stage::Relocating),
            Self::Cancelled { stage } => Some(*stage),
            Self::Access(_) | Self::Io(_) => None,
        }
    }
}
