//! High-level entry points.

use crate::PackratError;
use crate::Result;
use crate::config::PipelineConfig;
use crate::encryption::Cipher;
use crate::encryption::Passphrase;
use crate::pipeline::Pipeline;
use crate::pipeline::PipelineFailure;
use crate::pipeline::naming::decrypted_path;
use crate::report::PipelineReport;
use std::path::Path;
use std::path::PathBuf;
use tracing::info;

/// Runs the archive pipeline with default collaborators.
///
/// `work_dir` is the default working folder (see [`Pipeline::new`]).
///
/// # Errors
///
/// Returns a [`PipelineFailure`] if any stage fails.
///
/// # Examples
///
/// ```no_run
/// use packrat_core::config::ConfigFile;
/// use packrat_core::run_pipeline;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ConfigFile::load("backup.json".as_ref())?.validate()?;
/// let report = run_pipeline(config, "/var/tmp")?;
/// println!("{} files archived", report.build.files_added);
/// # Ok(())
/// # }
/// ```
pub fn run_pipeline(
    config: PipelineConfig,
    work_dir: impl Into<PathBuf>,
) -> std::result::Result<PipelineReport, PipelineFailure> {
    Pipeline::new(config, work_dir).run()
}

/// Decrypts an encrypted archive next to itself and returns the output
/// path.
///
/// The output is the input with its last extension removed
/// (`Backup.zip.enc` becomes `Backup.zip`), or the input with `.decrypted`
/// appended when it has no extension.
///
/// # Errors
///
/// Returns `PackratError::Decryption` if the input is missing, the output
/// already exists, the passphrase is empty or wrong, the tool is missing,
/// or the input is corrupt. No output file is left behind on error.
///
/// # Examples
///
/// ```no_run
/// use packrat_core::decrypt_archive;
/// use packrat_core::encryption::OpenSslCipher;
/// use packrat_core::encryption::Passphrase;
/// use std::path::Path;
///
/// let restored = decrypt_archive(
///     Path::new("/backups/Backup.zip.enc"),
///     &Passphrase::new("s3cret"),
///     &OpenSslCipher::new(),
/// )?;
/// assert_eq!(restored, Path::new("/backups/Backup.zip"));
/// # Ok::<(), packrat_core::PackratError>(())
/// ```
pub fn decrypt_archive(input: &Path, passphrase: &Passphrase, cipher: &dyn Cipher) -> Result<PathBuf> {
    let output = decrypted_path(input);
    info!(
        input = %input.display(),
        output = %output.display(),
        method = %cipher.method(),
        "decrypting archive"
    );
    cipher
        .decrypt(input, &output, passphrase)
        .map_err(PackratError::Decryption)?;
    Ok(output)
}
