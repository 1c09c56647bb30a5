//! Archive build reporting.

use crate::AccessError;
use std::time::Duration;

/// Statistics of one archive build.
///
/// # Examples
///
/// ```
/// use packrat_core::creation::BuildReport;
///
/// let mut report = BuildReport::default();
/// report.bytes_read = 1000;
/// report.archive_size = 250;
///
/// assert_eq!(report.compression_ratio(), 4.0);
/// assert_eq!(report.compression_percentage(), 75.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Number of regular files added.
    pub files_added: usize,

    /// Number of explicit directory entries added.
    pub directories_added: usize,

    /// Number of symbolic links stored as links.
    pub symlinks_added: usize,

    /// Entries left out because an exclusion pattern matched. An excluded
    /// directory counts once.
    pub entries_excluded: usize,

    /// Target paths that were archived.
    pub targets_archived: usize,

    /// Total bytes read from source files (uncompressed).
    pub bytes_read: u64,

    /// Size of the finished archive on disk.
    pub archive_size: u64,

    /// Duration of the build.
    pub duration: Duration,

    /// Entries that could not be read and were skipped.
    pub access_errors: Vec<AccessError>,
}

impl BuildReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an entry that was skipped because it could not be read.
    pub fn record_access_error(&mut self, error: AccessError) {
        self.access_errors.push(error);
    }

    /// Returns whether any entry was skipped because of an access error.
    #[must_use]
    pub fn has_access_errors(&self) -> bool {
        !self.access_errors.is_empty()
    }

    /// Total number of members written (files, directories and links).
    #[must_use]
    pub fn members_added(&self) -> usize {
        self.files_added + self.directories_added + self.symlinks_added
    }

    /// Returns the compression ratio (uncompressed / compressed).
    ///
    /// Returns 0.0 if either size is zero.
    #[must_use]
    pub fn compression_ratio(&self) -> f64 {
        if self.archive_size == 0 || self.bytes_read == 0 {
            return 0.0;
        }
        self.bytes_read as f64 / self.archive_size as f64
    }

    /// Returns the space saved by compression, in percent.
    ///
    /// Returns 0.0 if nothing was read or the archive grew.
    #[must_use]
    pub fn compression_percentage(&self) -> f64 {
        if self.bytes_read == 0 || self.archive_size >= self.bytes_read {
            return 0.0;
        }
        (1.0 - self.archive_size as f64 / self.bytes_read as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_default() {
        let report = BuildReport::default();
        assert_eq!(report.files_added, 0);
        assert_eq!(report.members_added(), 0);
        assert!(!report.has_access_errors());
    }

    #[test]
    fn test_members_added() {
        let report = BuildReport {
            files_added: 3,
            directories_added: 2,
            symlinks_added: 1,
            ..Default::default()
        };
        assert_eq!(report.members_added(), 6);
    }

    #[test]
    fn test_record_access_error() {
        let mut report = BuildReport::new();
        report.record_access_error(AccessError::new("/data/locked.db", "permission denied"));
        assert!(report.has_access_errors());
        assert_eq!(report.access_errors[0].path.to_str(), Some("/data/locked.db"));
    }

    #[test]
    fn test_compression_edge_cases() {
        let mut report = BuildReport::new();
        assert_eq!(report.compression_ratio(), 0.0);
        assert_eq!(report.compression_percentage(), 0.0);

        report.bytes_read = 100;
        report.archive_size = 150;
        assert_eq!(report.compression_percentage(), 0.0);

        report.archive_size = 50;
        assert_eq!(report.compression_ratio(), 2.0);
        assert_eq!(report.compression_percentage(), 50.0);
    }
}
