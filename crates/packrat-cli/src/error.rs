//! Error conversion utilities for CLI.
//!
//! Converts packrat-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use packrat_core::CipherError;
use packrat_core::PackratError;
use packrat_core::PipelineFailure;
use std::path::Path;

/// Converts a configuration load or validation error.
pub fn convert_config_error(err: PackratError, config: &Path) -> anyhow::Error {
    match err {
        PackratError::Config { reason } => anyhow!(
            "Invalid configuration '{}': {}\n\
             HINT: Run 'packrat init <CONFIG>' to write a template with every field.",
            config.display(),
            reason
        ),
        PackratError::AlreadyExists { path } => anyhow!(
            "Configuration file already exists: {}\n\
             HINT: Choose another name; existing files are never overwritten.",
            path.display()
        ),
        other => anyhow::Error::from(other)
            .context(format!("Error reading configuration '{}'", config.display())),
    }
}

/// Converts a failed pipeline run, naming the stage and any artifact kept.
pub fn convert_pipeline_failure(failure: PipelineFailure) -> anyhow::Error {
    let PipelineFailure {
        stage,
        error,
        retained_artifact,
    } = failure;

    let kept = retained_artifact.map_or_else(String::new, |path| {
        format!("\nKept artifact: {}", path.display())
    });

    let hint = match &error {
        PackratError::Encryption(cipher) => cipher_hint(cipher),
        PackratError::NothingToArchive => {
            "Check that 'target_paths' point to existing files or folders."
        }
        PackratError::AlreadyExists { .. } => {
            "Move the existing file away or enable 'timestamp' for unique names."
        }
        PackratError::Busy { .. } => {
            "Wait for the other run to finish; the lock is released when it exits."
        }
        PackratError::Relocation { .. } => {
            "Make sure 'destination_folder' exists and is writable."
        }
        PackratError::Cancelled { .. } => "The run was interrupted; nothing was relocated.",
        PackratError::Traversal { .. } => {
            "A symlink loop was found; disable 'follow_symlinks' or exclude the loop."
        }
        _ => "",
    };

    let message = format!("Backup failed during {stage}: {error}{kept}");
    if hint.is_empty() {
        anyhow!(message)
    } else {
        anyhow!("{message}\nHINT: {hint}")
    }
}

/// Converts a decryption error for `archive`.
pub fn convert_decrypt_error(err: PackratError, archive: &Path) -> anyhow::Error {
    match err {
        PackratError::Decryption(cipher) => {
            let hint = match &cipher {
                CipherError::ToolFailed { .. } => {
                    "The passphrase may be wrong or the archive may be corrupt."
                }
                CipherError::EmptyPassphrase => {
                    "Set 'passphrase' in the configuration used for encryption."
                }
                other => cipher_hint(other),
            };
            anyhow!(
                "Failed to decrypt '{}': {}\nHINT: {}",
                archive.display(),
                cipher,
                hint
            )
        }
        other => anyhow::Error::from(other)
            .context(format!("Error decrypting '{}'", archive.display())),
    }
}

fn cipher_hint(err: &CipherError) -> &'static str {
    match err {
        CipherError::ToolMissing { .. } => {
            "Install the tool or set 'encryption_method' to one that is installed (openssl, gpg)."
        }
        CipherError::TimedOut { .. } => "Increase --tool-timeout for large archives.",
        CipherError::OutputExists { .. } => "Remove or rename the existing output file.",
        CipherError::InputMissing { .. } => "Check the archive path.",
        _ => "Run with --verbose for the tool's diagnostics.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use packrat_core::Stage;
    use std::path::PathBuf;

    #[test]
    fn test_convert_config_error() {
        let err = PackratError::config("compress_level must be between 0 and 9");
        let msg = format!("{:?}", convert_config_error(err, Path::new("backup.json")));
        assert!(msg.contains("backup.json"));
        assert!(msg.contains("compress_level"));
        assert!(msg.contains("HINT"));
    }

    #[test]
    fn test_convert_encryption_failure() {
        let failure = PipelineFailure {
            stage: Stage::Encrypting,
            error: PackratError::Encryption(CipherError::ToolMissing {
                program: PathBuf::from("gpg"),
            }),
            retained_artifact: Some(PathBuf::from("/work/Backup.zip")),
        };
        let msg = format!("{:?}", convert_pipeline_failure(failure));
        assert!(msg.contains("ENCRYPTING"));
        assert!(msg.contains("/work/Backup.zip"));
        assert!(msg.contains("Install the tool"));
    }

    #[test]
    fn test_convert_wrong_passphrase() {
        let err = PackratError::Decryption(CipherError::ToolFailed {
            program: PathBuf::from("openssl"),
            code: Some(1),
            stderr: "bad decrypt".to_string(),
        });
        let msg = format!("{:?}", convert_decrypt_error(err, Path::new("Backup.zip.enc")));
        assert!(msg.contains("Backup.zip.enc"));
        assert!(msg.contains("passphrase may be wrong"));
    }
}
