//! Artifact naming.
//!
//! A run produces at most three paths, all fixed during NAMING:
//!
//! - the archive: `<work dir>/<prefix>[-<timestamp>].zip`
//! - the encrypted archive: the archive path plus the method suffix
//! - the relocated copy: `<destination>/<final file name>`

use crate::PackratError;
use crate::Result;
use chrono::NaiveDateTime;
use std::ffi::OsString;
use std::path::Path;
use std::path::PathBuf;

/// Sortable timestamp used in archive names, e.g. `2024-03-01T093015`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H%M%S";

/// Container extension.
pub const ARCHIVE_EXTENSION: &str = ".zip";

/// Suffix used by [`decrypted_path`] for inputs without an extension.
pub const DECRYPTED_SUFFIX: &str = ".decrypted";

/// Builds the archive file name from a prefix and optional timestamp.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use packrat_core::pipeline::naming::archive_file_name;
///
/// let at = NaiveDate::from_ymd_opt(2024, 3, 1)
///     .and_then(|d| d.and_hms_opt(9, 30, 15))
///     .unwrap();
/// assert_eq!(archive_file_name("Backup", Some(at)), "Backup-2024-03-01T093015.zip");
/// assert_eq!(archive_file_name("Backup", None), "Backup.zip");
/// ```
#[must_use]
pub fn archive_file_name(prefix: &str, timestamp: Option<NaiveDateTime>) -> String {
    match timestamp {
        Some(ts) => format!(
            "{prefix}-{}{ARCHIVE_EXTENSION}",
            ts.format(TIMESTAMP_FORMAT)
        ),
        None => format!("{prefix}{ARCHIVE_EXTENSION}"),
    }
}

/// Output path for decrypting `input`: its last extension removed, or
/// [`DECRYPTED_SUFFIX`] appended when it has none.
///
/// # Examples
///
/// ```
/// use packrat_core::pipeline::naming::decrypted_path;
/// use std::path::Path;
///
/// assert_eq!(decrypted_path(Path::new("/b/Backup.zip.enc")), Path::new("/b/Backup.zip"));
/// assert_eq!(decrypted_path(Path::new("/b/blob")), Path::new("/b/blob.decrypted"));
/// ```
#[must_use]
pub fn decrypted_path(input: &Path) -> PathBuf {
    if input.extension().is_some() {
        input.with_extension("")
    } else {
        append_suffix(input, DECRYPTED_SUFFIX)
    }
}

/// Appends `suffix` to the final component of `path` without touching its
/// existing extension.
#[must_use]
pub fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Every path a run may create, resolved up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Folder the archive is built in.
    pub work_dir: PathBuf,
    /// The unencrypted archive.
    pub archive: PathBuf,
    /// The encrypted archive, when encryption is on.
    pub encrypted: Option<PathBuf>,
    /// The relocated copy, when relocation applies.
    pub destination: Option<PathBuf>,
}

impl ArtifactPaths {
    /// Resolves the artifact paths of one run.
    ///
    /// `destination_folder` is dropped when it is the working folder
    /// itself, so no copy onto the same file is attempted.
    #[must_use]
    pub fn resolve(
        work_dir: &Path,
        file_name: &str,
        encryption_suffix: Option<&str>,
        destination_folder: Option<&Path>,
    ) -> Self {
        let archive = work_dir.join(file_name);
        let encrypted = encryption_suffix.map(|suffix| append_suffix(&archive, suffix));
        let final_name = encrypted
            .as_deref()
            .unwrap_or(&archive)
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(file_name));
        let destination = destination_folder
            .filter(|folder| !same_location(folder, work_dir))
            .map(|folder| folder.join(final_name));

        Self {
            work_dir: work_dir.to_path_buf(),
            archive,
            encrypted,
            destination,
        }
    }

    /// The artifact the run should end with before relocation.
    #[must_use]
    pub fn final_local(&self) -> &Path {
        self.encrypted.as_deref().unwrap_or(&self.archive)
    }

    /// Fails if any planned output already exists.
    ///
    /// # Errors
    ///
    /// Returns `PackratError::AlreadyExists` naming the first taken path.
    pub fn ensure_available(&self) -> Result<()> {
        let planned = std::iter::once(self.archive.as_path())
            .chain(self.encrypted.as_deref())
            .chain(self.destination.as_deref());

        for path in planned {
            if path.exists() {
                return Err(PackratError::AlreadyExists {
                    path: path.to_path_buf(),
                });
            }
        }
        Ok(())
    }
}

/// Compares two folders after resolving them, falling back to a plain
/// comparison when either cannot be resolved.
fn same_location(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
