//! Backup archiving pipeline: select files, zip them, encrypt, relocate.
//!
//! `packrat-core` walks one or more target paths, skips entries that match
//! configured exclusion patterns, writes a ZIP archive, optionally encrypts
//! it with an external tool (OpenSSL or GnuPG), moves the result to a
//! destination folder and removes the intermediate files.
//!
//! # Examples
//!
//! ```no_run
//! use packrat_core::ConfigFile;
//! use packrat_core::run_pipeline;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigFile::load(Path::new("backup.json"))?.validate()?;
//! let report = run_pipeline(config, std::env::current_dir()?)?;
//! println!("Archive written to {}", report.final_path.display());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod creation;
pub mod encryption;
pub mod error;
pub mod pipeline;
pub mod report;

#[cfg(test)]
mod test_utils;

// Re-export main API types
pub use api::decrypt_archive;
pub use api::run_pipeline;
pub use config::ConfigFile;
pub use config::PipelineConfig;
pub use encryption::Cipher;
pub use encryption::CipherError;
pub use encryption::EncryptionMethod;
pub use encryption::Passphrase;
pub use error::AccessError;
pub use error::PackratError;
pub use error::Result;
pub use pipeline::CancelToken;
pub use pipeline::Pipeline;
pub use pipeline::PipelineFailure;
pub use pipeline::Stage;
pub use report::CleanupFailure;
pub use report::NoopProgress;
pub use report::PipelineReport;
pub use report::ProgressCallback;
