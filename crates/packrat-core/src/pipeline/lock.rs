//! Working-folder exclusivity.
//!
//! Two runs sharing a working folder could delete each other's in-flight
//! artifacts during cleanup, so a run holds an advisory lock on
//! `<working folder>/.packrat.lock` from NAMING to the end.
//!
//! The holder unlinks the lock file before unlocking it. A run that opened
//! the old file can then lock an inode nobody else will ever see, so a lock
//! only counts once the path still names the locked inode.

use crate::PackratError;
use crate::Result;
use fs2::FileExt;
use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use tracing::debug;

/// Name of the lock file inside the working folder.
pub const LOCK_FILE_NAME: &str = ".packrat.lock";

/// Times to reopen the lock file after it was replaced under us.
const MAX_ATTEMPTS: usize = 8;

/// Holds the working-folder lock until dropped.
///
/// Dropping the guard deletes the lock file and releases the lock.
pub struct WorkdirLock {
    file: File,
    path: PathBuf,
}

impl WorkdirLock {
    /// Takes the lock without blocking.
    ///
    /// # Errors
    ///
    /// Returns `PackratError::Busy` if another run holds the lock, or
    /// `PackratError::Io` if the lock file cannot be created.
    pub fn acquire(folder: &Path) -> Result<Self> {
        let path = folder.join(LOCK_FILE_NAME);

        for attempt in 1..=MAX_ATTEMPTS {
            let file = open_lock_file(&path)?;
            if let Some(lock) = Self::claim(file, &path, folder)? {
                return Ok(lock);
            }
            debug!(path = %path.display(), attempt, "lock file replaced while locking, retrying");
        }

        Err(PackratError::Busy {
            folder: folder.to_path_buf(),
        })
    }

    /// Locks an opened lock file and checks that `path` still names it.
    ///
    /// Returns `Ok(None)` when the file was unlinked or replaced, which
    /// makes the lock worthless; the handle is closed and unlocked.
    fn claim(file: File, path: &Path, folder: &Path) -> Result<Option<Self>> {
        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {}
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                return Err(PackratError::Busy {
                    folder: folder.to_path_buf(),
                });
            }
            Err(e) => return Err(PackratError::Io(e)),
        }

        if !names_same_file(&file, path)? {
            return Ok(None);
        }

        debug!(path = %path.display(), "acquired working folder lock");
        Ok(Some(Self {
            file,
            path: path.to_path_buf(),
        }))
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn open_lock_file(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
}

#[cfg(unix)]
fn names_same_file(file: &File, path: &Path) -> io::Result<bool> {
    use std::os::unix::fs::MetadataExt;

    let held = file.metadata()?;
    match std::fs::metadata(path) {
        Ok(current) => Ok(held.dev() == current.dev() && held.ino() == current.ino()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

// An open file cannot be deleted on Windows, so the path always names it.
#[cfg(not(unix))]
fn names_same_file(_file: &File, path: &Path) -> io::Result<bool> {
    Ok(path.exists())
}

impl Drop for WorkdirLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            debug!(path = %self.path.display(), error = %e, "failed to remove lock file");
        }
        let _ = FileExt::unlock(&self.file);
        debug!(path = %self.path.display(), "released working folder lock");
    }
}

impl std::fmt::Debug for WorkdirLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkdirLock")
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_second_lock_is_busy() {
        let temp = TempDir::new().unwrap();
        let first = WorkdirLock::acquire(temp.path()).unwrap();

        let second = WorkdirLock::acquire(temp.path());
        assert!(matches!(second, Err(PackratError::Busy { .. })));

        drop(first);
        assert!(WorkdirLock::acquire(temp.path()).is_ok());
    }

    #[test]
    fn test_lock_file_removed_on_drop() {
        let temp = TempDir::new().unwrap();
        let lock = WorkdirLock::acquire(temp.path()).unwrap();
        let path = lock.path().to_path_buf();
        assert!(path.exists());

        drop(lock);
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_folder_is_io_error() {
        let temp = TempDir::new().unwrap();
        let result = WorkdirLock::acquire(&temp.path().join("absent"));
        assert!(matches!(result, Err(PackratError::Io(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_handle_opened_before_release_cannot_share_lock() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(LOCK_FILE_NAME);

        let first = WorkdirLock::acquire(temp.path()).unwrap();
        let stale = open_lock_file(&path).unwrap();
        drop(first);

        // The old inode is unlinked: locking it alone must not be a grant.
        let claimed = WorkdirLock::claim(stale, &path, temp.path()).unwrap();
        assert!(claimed.is_none());

        let fresh = WorkdirLock::acquire(temp.path()).unwrap();
        assert!(path.exists());

        let late = open_lock_file(&path).unwrap();
        let result = WorkdirLock::claim(late, &path, temp.path());
        assert!(matches!(result, Err(PackratError::Busy { .. })));

        drop(fresh);
    }

    #[cfg(unix)]
    #[test]
    fn test_stale_lock_holder_does_not_block_new_run() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(LOCK_FILE_NAME);

        let first = WorkdirLock::acquire(temp.path()).unwrap();
        let stale = open_lock_file(&path).unwrap();
        drop(first);
        FileExt::try_lock_exclusive(&stale).unwrap();

        // The stale holder locks a different inode, so the path is free
        // and exactly one real lock exists on it.
        let fresh = WorkdirLock::acquire(temp.path()).unwrap();
        assert!(!names_same_file(&stale, &path).unwrap());
        assert!(names_same_file(&fresh.file, &path).unwrap());
        assert!(matches!(
            WorkdirLock::acquire(temp.path()),
            Err(PackratError::Busy { .. })
        ));
    }
}
