//! ZIP archive assembly.
//!
//! Every target path becomes one top-level member named after the target's
//! basename (its *root label*); entries below it keep their relative
//! layout. Member names always use forward slashes.

use crate::AccessError;
use crate::PackratError;
use crate::ProgressCallback;
use crate::Result;
use crate::creation::compression::CompressionLevel;
use crate::creation::report::BuildReport;
use crate::creation::walker::EntryType;
use crate::creation::walker::TraversalEntry;
use crate::creation::walker::TreeWalker;
use crate::pipeline::CancelToken;
use crate::pipeline::Stage;
use crate::report::NoopProgress;
use std::fs::File;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::io::Write;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;
use std::time::Instant;
use tracing::debug;
use tracing::warn;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Entries at or above this size need zip64 headers.
const LARGE_FILE_THRESHOLD: u64 = u32::MAX as u64;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Builds a single-target archive at `output`.
///
/// The output file must not exist yet. On failure the partial file is
/// removed.
///
/// # Examples
///
/// ```no_run
/// use packrat_core::creation::compression::CompressionLevel;
/// use packrat_core::creation::filters::ExclusionSet;
/// use packrat_core::creation::walker::TreeWalker;
/// use packrat_core::creation::zip::build_archive;
/// use std::path::Path;
///
/// let exclusions = ExclusionSet::new(["*.log"])?;
/// let walker = TreeWalker::new(Path::new("/data/project"), false, &exclusions);
/// let report = build_archive(
///     walker.walk(),
///     "project",
///     CompressionLevel::BEST,
///     Path::new("/backups/project.zip"),
/// )?;
/// println!("added {} files", report.files_added);
/// # Ok::<(), packrat_core::PackratError>(())
/// ```
///
/// # Errors
///
/// Returns an error if the output exists or cannot be created, a source
/// file fails mid-read, the container cannot be written, or traversal hits
/// a fatal error. Unreadable entries are recorded in the report instead.
pub fn build_archive<I>(
    entries: I,
    root_label: &str,
    level: CompressionLevel,
    output: &Path,
) -> Result<BuildReport>
where
    I: IntoIterator<Item = Result<TraversalEntry>>,
{
    let mut builder = ArchiveBuilder::create(output, level)?;
    let built = builder
        .add_entries(entries, root_label, &mut NoopProgress, &CancelToken::new())
        .and_then(|()| builder.finish());

    match built {
        Ok((_file, mut report)) => {
            report.targets_archived = 1;
            Ok(report)
        }
        Err(e) => {
            let _ = std::fs::remove_file(output);
            Err(e)
        }
    }
}

/// Streams traversal entries into a zip container.
///
/// Multiple targets can be added to one builder; they are written in the
/// order they are added.
pub struct ArchiveBuilder<W: Write + Seek> {
    zip: ZipWriter<W>,
    options: SimpleFileOptions,
    output: PathBuf,
    report: BuildReport,
    buffer: Vec<u8>,
    members: usize,
    started: Instant,
    own_files: Vec<PathBuf>,
}

impl ArchiveBuilder<File> {
    /// Creates the output file and a builder writing to it.
    ///
    /// # Errors
    ///
    /// Returns `PackratError::AlreadyExists` if `output` exists, or
    /// `PackratError::Build` if it cannot be created.
    pub fn create(output: &Path, level: CompressionLevel) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(output)
            .map_err(|e| {
                if e.kind() == ErrorKind::AlreadyExists {
                    PackratError::AlreadyExists {
                        path: output.to_path_buf(),
                    }
                } else {
                    PackratError::Build {
                        archive: output.to_path_buf(),
                        reason: format!("cannot create archive file: {e}"),
                    }
                }
            })?;
        let mut builder = Self::new(file, output, level);
        builder.skip_path(output);
        Ok(builder)
    }
}

impl<W: Write + Seek> ArchiveBuilder<W> {
    /// Wraps an arbitrary writer. `output` is only used in error messages.
    pub fn new(writer: W, output: impl Into<PathBuf>, level: CompressionLevel) -> Self {
        Self {
            zip: ZipWriter::new(writer),
            options: level.zip_options(),
            output: output.into(),
            report: BuildReport::default(),
            buffer: vec![0u8; COPY_BUFFER_SIZE],
            members: 0,
            started: Instant::now(),
            own_files: Vec::new(),
        }
    }

    /// Never archives the file at `path`, e.g. the archive being written
    /// when a target contains the working folder.
    pub fn skip_path(&mut self, path: &Path) {
        if let Ok(resolved) = path.canonicalize() {
            self.own_files.push(resolved);
        }
    }

    /// Adds every entry of a walk under `root_label` and records how many
    /// entries the walker excluded.
    ///
    /// # Errors
    ///
    /// See [`ArchiveBuilder::add_entries`].
    pub fn add_tree(
        &mut self,
        walker: &TreeWalker<'_>,
        root_label: &str,
        progress: &mut dyn ProgressCallback,
        cancel: &CancelToken,
    ) -> Result<()> {
        let result = self.add_entries(walker.walk(), root_label, progress, cancel);
        self.report.entries_excluded += walker.excluded_count();
        if result.is_ok() {
            self.report.targets_archived += 1;
        }
        result
    }

    /// Adds entries under `root_label`.
    ///
    /// Recoverable (access) errors from the entry stream are recorded and
    /// skipped; any other error aborts.
    ///
    /// # Errors
    ///
    /// Returns `PackratError::Traversal` on a fatal walk error,
    /// `PackratError::Build` on a write or mid-read failure, and
    /// `PackratError::Cancelled` if `cancel` fires.
    pub fn add_entries<I>(
        &mut self,
        entries: I,
        root_label: &str,
        progress: &mut dyn ProgressCallback,
        cancel: &CancelToken,
    ) -> Result<()>
    where
        I: IntoIterator<Item = Result<TraversalEntry>>,
    {
        for entry in entries {
            if cancel.is_cancelled() {
                return Err(PackratError::Cancelled {
                    stage: Stage::Building,
                });
            }

            match entry {
                Ok(entry) => self.add_entry(&entry, root_label, progress)?,
                Err(PackratError::Access(err)) => self.skip(err),
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Adds one entry as `root_label/relative_path`.
    ///
    /// # Errors
    ///
    /// Returns `PackratError::Build` if the container cannot be written or
    /// the source fails after its member was started.
    pub fn add_entry(
        &mut self,
        entry: &TraversalEntry,
        root_label: &str,
        progress: &mut dyn ProgressCallback,
    ) -> Result<()> {
        if self.is_own_file(&entry.path) {
            debug!(path = %entry.path.display(), "skipping pipeline artifact");
            return Ok(());
        }

        let name = match member_name(root_label, &entry.relative_path) {
            Ok(name) => name,
            Err(err) => {
                self.skip(err.with_path(&entry.path));
                return Ok(());
            }
        };

        self.members += 1;
        progress.on_entry_start(&name, self.members);

        match &entry.entry_type {
            EntryType::Directory => {
                self.zip
                    .add_directory(format!("{name}/"), self.options)
                    .map_err(|e| self.build_error(format!("failed to add directory {name}: {e}")))?;
                self.report.directories_added += 1;
            }
            EntryType::File => {
                if !self.add_file(&entry.path, &name, progress)? {
                    return Ok(());
                }
            }
            EntryType::Symlink { target } => {
                let target = target.to_string_lossy().replace('\\', "/");
                self.zip
                    .add_symlink(name.clone(), target, self.options)
                    .map_err(|e| self.build_error(format!("failed to add symlink {name}: {e}")))?;
                self.report.symlinks_added += 1;
            }
        }

        progress.on_entry_complete(&name);
        Ok(())
    }

    /// Writes the central directory and returns the writer with the final
    /// statistics.
    ///
    /// # Errors
    ///
    /// Returns `PackratError::Build` if the container cannot be finalized.
    pub fn finish(self) -> Result<(W, BuildReport)> {
        let Self {
            zip,
            output,
            mut report,
            started,
            ..
        } = self;

        let build_error = |reason: String| PackratError::Build {
            archive: output.clone(),
            reason,
        };

        let mut writer = zip
            .finish()
            .map_err(|e| build_error(format!("failed to finish ZIP archive: {e}")))?;
        writer
            .flush()
            .map_err(|e| build_error(format!("failed to flush archive: {e}")))?;
        report.archive_size = writer
            .seek(SeekFrom::End(0))
            .map_err(|e| build_error(format!("failed to measure archive: {e}")))?;
        report.duration = started.elapsed();

        Ok((writer, report))
    }

    /// Statistics collected so far.
    #[must_use]
    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    /// Copies one source file into the container.
    ///
    /// Returns `Ok(false)` if the file could not be opened and was skipped.
    fn add_file(
        &mut self,
        path: &Path,
        name: &str,
        progress: &mut dyn ProgressCallback,
    ) -> Result<bool> {
        let (mut file, metadata) = match File::open(path).and_then(|f| {
            let metadata = f.metadata()?;
            Ok((f, metadata))
        }) {
            Ok(opened) => opened,
            Err(e) => {
                self.skip(AccessError::new(path, e.to_string()));
                return Ok(false);
            }
        };

        let mut options = self.options;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            options = options.unix_permissions(metadata.permissions().mode());
        }
        if metadata.len() >= LARGE_FILE_THRESHOLD {
            options = options.large_file(true);
        }

        self.zip
            .start_file(name, options)
            .map_err(|e| self.build_error(format!("failed to start {name}: {e}")))?;

        let mut bytes_read = 0u64;
        loop {
            let n = file
                .read(&mut self.buffer)
                .map_err(|e| self.build_error(format!("failed to read {}: {e}", path.display())))?;
            if n == 0 {
                break;
            }
            self.zip
                .write_all(&self.buffer[..n])
                .map_err(|e| self.build_error(format!("failed to write {name}: {e}")))?;
            bytes_read += n as u64;
            progress.on_bytes_written(n as u64);
        }

        self.report.files_added += 1;
        self.report.bytes_read += bytes_read;
        Ok(true)
    }

    fn is_own_file(&self, path: &Path) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };
        self.own_files
            .iter()
            .filter(|own| own.file_name() == Some(name))
            .any(|own| path.canonicalize().is_ok_and(|p| &p == own))
    }

    fn skip(&mut self, err: AccessError) {
        warn!(path = %err.path.display(), reason = %err.reason, "skipping unreadable entry");
        self.report.record_access_error(err);
    }

    fn build_error(&self, reason: String) -> PackratError {
        PackratError::Build {
            archive: self.output.clone(),
            reason,
        }
    }
}

/// Computes the archive member name `root_label/relative_path` with
/// forward slashes.
///
/// An empty relative path yields the label itself (the target root).
///
/// # Errors
///
/// Returns an `AccessError` if a path component is not valid UTF-8 and so
/// cannot be stored as a portable member name.
///
/// # Examples
///
/// ```
/// use packrat_core::creation::zip::member_name;
/// use std::path::Path;
///
/// assert_eq!(member_name("project", Path::new("src/main.txt")).unwrap(), "project/src/main.txt");
/// assert_eq!(member_name("notes.txt", Path::new("")).unwrap(), "notes.txt");
/// ```
pub fn member_name(root_label: &str, relative_path: &Path) -> std::result::Result<String, AccessError> {
    let mut name = String::from(root_label);
    for component in relative_path.components() {
        if let Component::Normal(part) = component {
            let part = part.to_str().ok_or_else(|| {
                AccessError::new(relative_path, "path is not valid UTF-8")
            })?;
            name.push('/');
            name.push_str(part);
        }
    }
    Ok(name)
}

/// Derives the root label of a target path from its final segment.
///
/// Paths without a usable final segment (`..`, `/project/.`) are resolved
/// first.
///
/// # Errors
///
/// Returns `PackratError::Config` if no label can be derived (the
/// file-system root) or the name is not valid UTF-8.
///
/// # Examples
///
/// ```
/// use packrat_core::creation::zip::root_label;
/// use std::path::Path;
///
/// assert_eq!(root_label(Path::new("/data/project"))?, "project");
/// assert_eq!(root_label(Path::new("/data/project/"))?, "project");
/// # Ok::<(), packrat_core::PackratError>(())
/// ```
pub fn root_label(target: &Path) -> Result<String> {
    let resolved;
    let name = match target.file_name() {
        Some(name) => name,
        None => {
            resolved = target.canonicalize().map_err(|e| {
                PackratError::config(format!(
                    "cannot resolve target path {}: {e}",
                    target.display()
                ))
            })?;
            resolved.file_name().ok_or_else(|| {
                PackratError::config(format!(
                    "target path {} has no name to use as archive root",
                    target.display()
                ))
            })?
        }
    };

    name.to_str().map(str::to_string).ok_or_else(|| {
        PackratError::config(format!(
            "target path {} is not valid UTF-8",
            target.display()
        ))
    })
}

impl AccessError {
    fn with_path(mut self, path: &Path) -> Self {
        self.path = path.to_path_buf();
        self
    }
}
