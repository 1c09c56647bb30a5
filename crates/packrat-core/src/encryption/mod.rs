//! Passphrase encryption through external command-line tools.
//!
//! Packrat does not implement cryptography. Each [`Cipher`] adapter owns
//! the argument grammar of one tool (`openssl` or `gpg`) and runs it via a
//! [`runner::CommandRunner`]. The passphrase always travels over the tool's
//! stdin, never on its command line.

pub mod gpg;
pub mod openssl;
pub mod runner;

pub use gpg::GpgCipher;
pub use openssl::OpenSslCipher;
pub use runner::CommandRunner;
pub use runner::SystemRunner;

use crate::PackratError;
use runner::RunnerError;
use runner::ToolInvocation;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// A secret passphrase.
///
/// `Debug` never prints the secret, so a passphrase can sit inside logged
/// configuration structs.
///
/// # Examples
///
/// ```
/// use packrat_core::encryption::Passphrase;
///
/// let pass = Passphrase::new("hunter2");
/// assert_eq!(pass.expose(), "hunter2");
/// assert_eq!(format!("{pass:?}"), "Passphrase(<redacted>)");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Passphrase(String);

impl Passphrase {
    /// Wraps a passphrase.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Returns the secret.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the empty passphrase, which disables encryption.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The bytes written to a tool's stdin: the secret and a newline.
    fn stdin_line(&self) -> Vec<u8> {
        let mut line = Vec::with_capacity(self.0.len() + 1);
        line.extend_from_slice(self.0.as_bytes());
        line.push(b'\n');
        line
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase(<redacted>)")
    }
}

/// Supported encryption tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EncryptionMethod {
    /// `openssl enc` with AES-256-CBC and PBKDF2.
    #[default]
    OpenSsl,
    /// `gpg --symmetric` with AES256.
    Gpg,
}

impl EncryptionMethod {
    /// Configuration name of the method.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenSsl => "openssl",
            Self::Gpg => "gpg",
        }
    }

    /// Suffix appended to the archive file name after encryption.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::OpenSsl => ".enc",
            Self::Gpg => ".gpg",
        }
    }

    /// Builds the adapter for this method with the given runner and
    /// optional per-invocation timeout.
    #[must_use]
    pub fn cipher(
        self,
        runner: Arc<dyn CommandRunner>,
        timeout: Option<Duration>,
    ) -> Box<dyn Cipher> {
        match self {
            Self::OpenSsl => Box::new(
                OpenSslCipher::new()
                    .with_runner(runner)
                    .with_timeout(timeout),
            ),
            Self::Gpg => Box::new(GpgCipher::new().with_runner(runner).with_timeout(timeout)),
        }
    }
}

impl FromStr for EncryptionMethod {
    type Err = PackratError;

    /// Parses a method name, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openssl" => Ok(Self::OpenSsl),
            "gpg" => Ok(Self::Gpg),
            other => Err(PackratError::config(format!(
                "unknown encryption_method '{other}' (expected 'openssl' or 'gpg')"
            ))),
        }
    }
}

impl fmt::Display for EncryptionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures of an encryption or decryption tool run.
#[derive(Error, Debug)]
pub enum CipherError {
    /// The selected tool is not installed.
    #[error("{program} is not installed or not on PATH")]
    ToolMissing {
        /// Tool that was looked up.
        program: PathBuf,
    },

    /// The file to process does not exist.
    #[error("input file not found: {path}")]
    InputMissing {
        /// Missing input.
        path: PathBuf,
    },

    /// The output file is already present.
    #[error("output file already exists: {path}")]
    OutputExists {
        /// Existing output.
        path: PathBuf,
    },

    /// No passphrase was given.
    #[error("passphrase is empty")]
    EmptyPassphrase,

    /// The tool ran and reported failure (wrong passphrase, corrupt input).
    #[error("{program} exited with {}", describe_failure(.code, .stderr))]
    ToolFailed {
        /// Tool that failed.
        program: PathBuf,
        /// Exit code, if any.
        code: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },

    /// The tool exceeded its timeout and was killed.
    #[error("{program} did not finish within {}s", .timeout.as_secs())]
    TimedOut {
        /// Tool that was killed.
        program: PathBuf,
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// The tool could not be started or its pipes failed.
    #[error("failed to run {program}: {source}")]
    Launch {
        /// Tool being run.
        program: PathBuf,
        /// Underlying cause.
        #[source]
        source: std::io::Error,
    },
}

fn describe_failure(code: &Option<i32>, stderr: &str) -> String {
    let status = code.map_or_else(|| "a signal".to_string(), |c| format!("status {c}"));
    if stderr.is_empty() {
        status
    } else {
        format!("{status}: {stderr}")
    }
}

impl From<RunnerError> for CipherError {
    fn from(err: RunnerError) -> Self {
        match err {
            RunnerError::NotFound { program } => Self::ToolMissing { program },
            RunnerError::TimedOut { program, timeout } => Self::TimedOut { program, timeout },
            RunnerError::Spawn { program, source } | RunnerError::Io { program, source } => {
                Self::Launch { program, source }
            }
        }
    }
}

/// Symmetric passphrase encryption backed by an external tool.
pub trait Cipher: Send + Sync {
    /// The method this adapter implements.
    fn method(&self) -> EncryptionMethod;

    /// Suffix the encrypted file gets.
    fn suffix(&self) -> &'static str {
        self.method().suffix()
    }

    /// Encrypts `input` into the new file `output`.
    ///
    /// # Errors
    ///
    /// Returns a [`CipherError`] if the tool is missing, the input is
    /// missing, the output exists, or the tool fails. No output file is
    /// left behind on error.
    fn encrypt(&self, input: &Path, output: &Path, passphrase: &Passphrase)
    -> Result<(), CipherError>;

    /// Decrypts `input` into the new file `output`.
    ///
    /// # Errors
    ///
    /// As for [`Cipher::encrypt`]; a wrong passphrase surfaces as
    /// [`CipherError::ToolFailed`].
    fn decrypt(&self, input: &Path, output: &Path, passphrase: &Passphrase)
    -> Result<(), CipherError>;
}

/// What a cipher adapter asks of [`run_tool`].
pub(crate) struct ToolRequest<'a> {
    pub runner: &'a dyn CommandRunner,
    pub program: &'a Path,
    pub timeout: Option<Duration>,
    pub input: &'a Path,
    pub output: &'a Path,
    pub passphrase: &'a Passphrase,
}

/// Shared pre-checks, execution and cleanup for every adapter.
///
/// `build_args` receives the resolved program path and returns the full
/// invocation minus stdin.
pub(crate) fn run_tool(
    request: &ToolRequest<'_>,
    build_args: impl FnOnce(PathBuf) -> ToolInvocation,
) -> Result<(), CipherError> {
    if request.passphrase.is_empty() {
        return Err(CipherError::EmptyPassphrase);
    }
    if !request.input.is_file() {
        return Err(CipherError::InputMissing {
            path: request.input.to_path_buf(),
        });
    }
    if request.output.exists() {
        return Err(CipherError::OutputExists {
            path: request.output.to_path_buf(),
        });
    }

    let program = request
        .runner
        .locate(request.program)
        .ok_or_else(|| CipherError::ToolMissing {
            program: request.program.to_path_buf(),
        })?;

    let invocation = build_args(program.clone()).stdin(request.passphrase.stdin_line());
    let result = match request.runner.run(&invocation, request.timeout) {
        Ok(output) if output.success && request.output.is_file() => Ok(()),
        Ok(output) if output.success => Err(CipherError::ToolFailed {
            program,
            code: output.code,
            stderr: "tool reported success but wrote no output".to_string(),
        }),
        Ok(output) => Err(CipherError::ToolFailed {
            program,
            code: output.code,
            stderr: output.stderr,
        }),
        Err(e) => Err(e.into()),
    };

    if result.is_err() && request.output.exists() {
        debug!(path = %request.output.display(), "removing partial tool output");
        let _ = std::fs::remove_file(request.output);
    }
    result
}
