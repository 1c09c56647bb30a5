//! Compression level handling.
//!
//! The configured level is the deflate level of every zip entry:
//!
//! - **0**: store (no compression)
//! - **1-3**: fast compression
//! - **9**: best compression (default)

use crate::PackratError;
use crate::Result;
use std::fmt;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

/// A validated compression level in `0..=9`.
///
/// # Examples
///
/// ```
/// use packrat_core::creation::compression::CompressionLevel;
///
/// let level = CompressionLevel::new(5)?;
/// assert_eq!(level.get(), 5);
/// assert!(CompressionLevel::new(10).is_err());
/// assert_eq!(CompressionLevel::default(), CompressionLevel::BEST);
/// # Ok::<(), packrat_core::PackratError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompressionLevel(u8);

impl CompressionLevel {
    /// Entries are stored without compression.
    pub const STORE: Self = Self(0);

    /// Maximum deflate compression.
    pub const BEST: Self = Self(9);

    /// Validates a level.
    ///
    /// # Errors
    ///
    /// Returns `PackratError::Config` if `level` is outside `0..=9`.
    pub fn new(level: i64) -> Result<Self> {
        u8::try_from(level)
            .ok()
            .filter(|l| *l <= 9)
            .map(Self)
            .ok_or_else(|| {
                PackratError::config(format!(
                    "compress_level must be between 0 and 9, got {level}"
                ))
            })
    }

    /// The numeric level.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Zip entry options for this level: Stored for 0, Deflated otherwise.
    #[must_use]
    pub fn zip_options(self) -> SimpleFileOptions {
        if self.0 == 0 {
            SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
        } else {
            SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(i64::from(self.0)))
        }
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self::BEST
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
