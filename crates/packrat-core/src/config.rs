//! Run configuration.
//!
//! [`ConfigFile`] mirrors the JSON document on disk, with every key
//! optional. [`ConfigFile::validate`] turns it into the immutable
//! [`PipelineConfig`] a pipeline run consumes.

use crate::PackratError;
use crate::Result;
use crate::creation::CompressionLevel;
use crate::creation::ExclusionSet;
use crate::encryption::EncryptionMethod;
use crate::encryption::Passphrase;
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

/// Passphrase written into a fresh template, so users notice it.
pub const TEMPLATE_PASSPHRASE: &str = "password";

/// The configuration document as stored on disk.
///
/// Unknown keys are ignored; missing keys take the defaults listed on
/// [`ConfigFile::default`].
///
/// # Examples
///
/// ```
/// use packrat_core::config::ConfigFile;
///
/// let file: ConfigFile = serde_json::from_str(r#"{
///     "target_paths": ["/data/project"],
///     "ignore_patterns": ["*.log", "node_modules"]
/// }"#)?;
///
/// let config = file.validate()?;
/// assert_eq!(config.archive_prefix, "Backup");
/// assert!(config.passphrase.is_none());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Folder the final artifact is copied to; empty disables relocation.
    pub destination_folder: String,

    /// Encryption passphrase; empty disables encryption.
    pub passphrase: String,

    /// `openssl` or `gpg`, case-insensitive.
    pub encryption_method: String,

    /// First part of the archive file name.
    pub archive_prefix: String,

    /// Append a sortable timestamp to the archive name.
    pub timestamp: bool,

    /// Deflate level, 0 (store) to 9.
    pub compress_level: i64,

    /// Delete intermediate artifacts after a successful run.
    pub cleanup: bool,

    /// Traverse into symlinked directories instead of storing links.
    pub follow_symlinks: bool,

    /// Folder the archive is built in; empty means the default working
    /// folder.
    pub compression_folder: String,

    /// Files and folders to archive, in archive order.
    pub target_paths: Vec<String>,

    /// Exclusion patterns.
    pub ignore_patterns: Vec<String>,
}

impl Default for ConfigFile {
    /// Default values:
    /// - `destination_folder`: `""`
    /// - `passphrase`: `""`
    /// - `encryption_method`: `"openssl"`
    /// - `archive_prefix`: `"Backup"`
    /// - `timestamp`: `true`
    /// - `compress_level`: `9`
    /// - `cleanup`: `false`
    /// - `follow_symlinks`: `false`
    /// - `compression_folder`: `""`
    /// - `target_paths`: `[]`
    /// - `ignore_patterns`: `[]`
    fn default() -> Self {
        Self {
            destination_folder: String::new(),
            passphrase: String::new(),
            encryption_method: EncryptionMethod::OpenSsl.as_str().to_string(),
            archive_prefix: "Backup".to_string(),
            timestamp: true,
            compress_level: i64::from(CompressionLevel::BEST.get()),
            cleanup: false,
            follow_symlinks: false,
            compression_folder: String::new(),
            target_paths: Vec::new(),
            ignore_patterns: Vec::new(),
        }
    }
}

impl fmt::Debug for ConfigFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigFile")
            .field("destination_folder", &self.destination_folder)
            .field(
                "passphrase",
                &if self.passphrase.is_empty() { "" } else { "<redacted>" },
            )
            .field("encryption_method", &self.encryption_method)
            .field("archive_prefix", &self.archive_prefix)
            .field("timestamp", &self.timestamp)
            .field("compress_level", &self.compress_level)
            .field("cleanup", &self.cleanup)
            .field("follow_symlinks", &self.follow_symlinks)
            .field("compression_folder", &self.compression_folder)
            .field("target_paths", &self.target_paths)
            .field("ignore_patterns", &self.ignore_patterns)
            .finish()
    }
}

impl ConfigFile {
    /// The document written by [`ConfigFile::write_template`].
    #[must_use]
    pub fn template() -> Self {
        Self {
            passphrase: TEMPLATE_PASSPHRASE.to_string(),
            target_paths: vec![String::new()],
            ..Self::default()
        }
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `PackratError::Config` if the file cannot be read or is not
    /// valid JSON of the expected shape.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            PackratError::config(format!(
                "cannot read configuration file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&text).map_err(|e| match e {
            PackratError::Config { reason } => {
                PackratError::config(format!("{}: {reason}", path.display()))
            }
            other => other,
        })
    }

    /// Parses a configuration document.
    ///
    /// # Errors
    ///
    /// Returns `PackratError::Config` if the text is not valid JSON or a key
    /// has the wrong type.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| PackratError::config(format!("malformed configuration: {e}")))
    }

    /// Writes the default template to `path` and returns the path written.
    ///
    /// A `.json` extension is added when missing. An existing file is
    /// never overwritten.
    ///
    /// # Errors
    ///
    /// Returns `PackratError::AlreadyExists` if the file exists, or
    /// `PackratError::Io` if it cannot be written.
    pub fn write_template(path: &Path) -> Result<PathBuf> {
        let path = if path.extension().is_some_and(|ext| ext == "json") {
            path.to_path_buf()
        } else {
            crate::pipeline::naming::append_suffix(path, ".json")
        };

        let mut text = serde_json::to_string_pretty(&Self::template())
            .map_err(|e| PackratError::config(format!("cannot serialize template: {e}")))?;
        text.push('\n');

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| {
                if e.kind() == ErrorKind::AlreadyExists {
                    PackratError::AlreadyExists { path: path.clone() }
                } else {
                    PackratError::Io(e)
                }
            })?;
        file.write_all(text.as_bytes())?;
        Ok(path)
    }

    /// Overrides `follow_symlinks`.
    #[must_use]
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Checks every field and produces the run configuration.
    ///
    /// Validation does not touch the file system.
    ///
    /// # Errors
    ///
    /// Returns `PackratError::Config` for:
    /// - no target paths, or an empty target path
    /// - a target path ending in `.`, `..` or a root, which has no name
    /// - two target paths with the same final segment
    /// - a passphrase containing a line break
    /// - `compress_level` outside 0-9
    /// - an unknown `encryption_method`
    /// - an empty `archive_prefix` or one containing a path separator
    /// - an exclusion pattern that does not compile
    pub fn validate(&self) -> Result<PipelineConfig> {
        if self.target_paths.is_empty() {
            return Err(PackratError::config("target_paths must not be empty"));
        }

        let mut labels = HashSet::new();
        let mut target_paths = Vec::with_capacity(self.target_paths.len());
        for raw in &self.target_paths {
            if raw.trim().is_empty() {
                return Err(PackratError::config("target_paths contains an empty path"));
            }
            let path = PathBuf::from(raw);
            let Some(name) = path.file_name() else {
                return Err(PackratError::config(format!(
                    "target path '{raw}' must end in a file or folder name, not '.', '..' or a root"
                )));
            };
            if !labels.insert(name.to_os_string()) {
                return Err(PackratError::config(format!(
                    "target paths share the archive root name '{}'",
                    name.to_string_lossy()
                )));
            }
            target_paths.push(path);
        }

        if self.passphrase.contains(['\n', '\r']) {
            return Err(PackratError::config("passphrase must not contain a line break"));
        }

        let compression_level = CompressionLevel::new(self.compress_level)?;
        let encryption_method: EncryptionMethod = self.encryption_method.parse()?;

        let prefix = self.archive_prefix.trim();
        if prefix.is_empty() {
            return Err(PackratError::config("archive_prefix must not be empty"));
        }
        if prefix.contains(['/', '\\']) {
            return Err(PackratError::config(format!(
                "archive_prefix '{prefix}' must not contain a path separator"
            )));
        }

        let exclusions = ExclusionSet::new(&self.ignore_patterns)?;

        Ok(PipelineConfig {
            target_paths,
            destination_folder: non_empty_path(&self.destination_folder),
            compression_folder: non_empty_path(&self.compression_folder),
            passphrase: (!self.passphrase.is_empty()).then(|| Passphrase::new(&self.passphrase)),
            encryption_method,
            archive_prefix: prefix.to_string(),
            timestamp: self.timestamp,
            compression_level,
            cleanup: self.cleanup,
            follow_symlinks: self.follow_symlinks,
            exclusions,
        })
    }
}

fn non_empty_path(raw: &str) -> Option<PathBuf> {
    (!raw.trim().is_empty()).then(|| PathBuf::from(raw))
}

/// A validated run configuration.
///
/// Built by [`ConfigFile::validate`]; a pipeline takes ownership of it for
/// one run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Files and folders to archive, in archive order.
    pub target_paths: Vec<PathBuf>,

    /// Folder the final artifact is copied to.
    pub destination_folder: Option<PathBuf>,

    /// Folder the archive is built in; `None` uses the pipeline's default
    /// working folder.
    pub compression_folder: Option<PathBuf>,

    /// Encryption passphrase; `None` disables encryption.
    pub passphrase: Option<Passphrase>,

    /// Tool used when encrypting.
    pub encryption_method: EncryptionMethod,

    /// First part of the archive file name.
    pub archive_prefix: String,

    /// Append a timestamp to the archive name.
    pub timestamp: bool,

    /// Deflate level of every member.
    pub compression_level: CompressionLevel,

    /// Delete intermediate artifacts after success.
    pub cleanup: bool,

    /// Traverse symlinked directories.
    pub follow_symlinks: bool,

    /// Compiled exclusion patterns.
    pub exclusions: ExclusionSet,
}

impl PipelineConfig {
    /// Returns `true` if the run encrypts its archive.
    #[must_use]
    pub fn encrypts(&self) -> bool {
        self.passphrase.is_some()
    }
}
