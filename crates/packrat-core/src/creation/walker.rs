//! Lazy directory traversal with exclusion pruning.
//!
//! The walker tests every entry against the exclusion set *before* it is
//! yielded, and an excluded directory is never opened: its subtree is
//! skipped without being read.

use crate::AccessError;
use crate::PackratError;
use crate::Result;
use crate::creation::filters::ExclusionSet;
use std::cell::Cell;
use std::path::Path;
use std::path::PathBuf;
use tracing::debug;
use walkdir::DirEntry;
use walkdir::WalkDir;

/// Walks a target path (file or directory) depth-first, pruning excluded
/// entries.
///
/// Children of a directory are visited in file-name order, so two walks of
/// the same tree yield the same sequence.
///
/// # Examples
///
/// ```no_run
/// use packrat_core::creation::filters::ExclusionSet;
/// use packrat_core::creation::walker::TreeWalker;
/// use std::path::Path;
///
/// let exclusions = ExclusionSet::new(["*.log", "node_modules"])?;
/// let walker = TreeWalker::new(Path::new("/data/project"), false, &exclusions);
///
/// for entry in walker.walk() {
///     match entry {
///         Ok(entry) => println!("{}", entry.relative_path.display()),
///         Err(e) if e.is_recoverable() => eprintln!("skipped: {e}"),
///         Err(e) => return Err(e),
///     }
/// }
/// # Ok::<(), packrat_core::PackratError>(())
/// ```
pub struct TreeWalker<'a> {
    root: &'a Path,
    follow_symlinks: bool,
    exclusions: &'a ExclusionSet,
    excluded: Cell<usize>,
}

impl<'a> TreeWalker<'a> {
    /// Creates a walker for `root`.
    #[must_use]
    pub fn new(root: &'a Path, follow_symlinks: bool, exclusions: &'a ExclusionSet) -> Self {
        Self {
            root,
            follow_symlinks,
            exclusions,
            excluded: Cell::new(0),
        }
    }

    /// Returns a lazy iterator over the surviving entries.
    ///
    /// Items are:
    /// - `Ok(entry)` for every entry that passed the exclusion set
    /// - `Err(PackratError::Access(_))` for an entry that could not be read;
    ///   the walk continues past it
    /// - `Err(PackratError::Traversal { .. })` for a symlink cycle when
    ///   following links; callers should stop
    ///
    /// With `follow_symlinks` off, symbolic links are yielded as leaf
    /// entries and never traversed.
    pub fn walk(&self) -> impl Iterator<Item = Result<TraversalEntry>> + '_ {
        WalkDir::new(self.root)
            .follow_links(self.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| self.keep(entry))
            .map(move |entry| match entry {
                Ok(entry) => self.build_entry(&entry),
                Err(err) => Err(self.convert_error(&err)),
            })
    }

    /// Number of entries pruned by the exclusion set so far.
    ///
    /// An excluded directory counts once, however large its subtree.
    #[must_use]
    pub fn excluded_count(&self) -> usize {
        self.excluded.get()
    }

    fn keep(&self, entry: &DirEntry) -> bool {
        let relative = entry.path().strip_prefix(self.root).unwrap_or(Path::new(""));
        let is_dir = entry.file_type().is_dir();

        if self
            .exclusions
            .is_excluded(relative, entry.file_name(), is_dir)
        {
            debug!(
                path = %entry.path().display(),
                directory = is_dir,
                "skipping excluded entry"
            );
            self.excluded.set(self.excluded.get() + 1);
            return false;
        }
        true
    }

    fn build_entry(&self, entry: &DirEntry) -> Result<TraversalEntry> {
        let path = entry.path().to_path_buf();
        let relative_path = path
            .strip_prefix(self.root)
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let file_type = entry.file_type();

        let entry_type = if file_type.is_symlink() {
            let target = std::fs::read_link(&path).map_err(|e| {
                AccessError::new(&path, format!("cannot read symlink target: {e}"))
            })?;
            EntryType::Symlink { target }
        } else if file_type.is_dir() {
            EntryType::Directory
        } else {
            EntryType::File
        };

        Ok(TraversalEntry {
            path,
            relative_path,
            entry_type,
            followed_link: entry.path_is_symlink() && !file_type.is_symlink(),
        })
    }

    fn convert_error(&self, err: &walkdir::Error) -> PackratError {
        let path = err
            .path()
            .map_or_else(|| self.root.to_path_buf(), Path::to_path_buf);

        if let Some(ancestor) = err.loop_ancestor() {
            return PackratError::Traversal {
                path,
                reason: format!("symlink cycle back to {}", ancestor.display()),
            };
        }

        let reason = err
            .io_error()
            .map_or_else(|| err.to_string(), ToString::to_string);
        PackratError::Access(AccessError::new(path, reason))
    }
}

/// One file-system object encountered during a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalEntry {
    /// Path on disk (the target root joined with `relative_path`).
    pub path: PathBuf,

    /// Path relative to the target root; empty for the root itself.
    pub relative_path: PathBuf,

    /// Kind of entry as it will be archived.
    pub entry_type: EntryType,

    /// `true` when `path` is a symlink that was followed to its target.
    pub followed_link: bool,
}

impl TraversalEntry {
    /// Returns `true` for directories (including followed links to
    /// directories).
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Directory
    }

    /// Returns `true` if the path on disk is a symbolic link, followed or
    /// not.
    #[must_use]
    pub fn is_symlink(&self) -> bool {
        self.followed_link || matches!(self.entry_type, EntryType::Symlink { .. })
    }
}

/// Type of traversal entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryType {
    /// Regular file (or a followed link to one).
    File,

    /// Directory (or a followed link to one).
    Directory,

    /// Symbolic link that is stored as a link, with its target path.
    Symlink {
        /// Target of the symlink.
        target: PathBuf,
    },
}
