//! Archive creation.
//!
//! Selects entries from the file system and streams them into a zip
//! container: [`filters`] decides what is excluded, [`walker`] enumerates
//! target paths lazily, and [`zip`] writes the members.

pub mod compression;
pub mod filters;
pub mod report;
pub mod walker;
pub mod zip;

pub use compression::CompressionLevel;
pub use filters::ExclusionPattern;
pub use filters::ExclusionSet;
pub use report::BuildReport;
pub use walker::EntryType;
pub use walker::TraversalEntry;
pub use walker::TreeWalker;
pub use zip::ArchiveBuilder;
