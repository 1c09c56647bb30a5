//! `gpg --symmetric` adapter.

use super::Cipher;
use super::CipherError;
use super::EncryptionMethod;
use super::Passphrase;
use super::ToolRequest;
use super::run_tool;
use super::runner::CommandRunner;
use super::runner::SystemRunner;
use super::runner::ToolInvocation;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Non-interactive passphrase handling: read it from fd 0, never ask the
/// agent or cache it.
const BATCH_ARGS: [&str; 7] = [
    "--batch",
    "--yes",
    "--pinentry-mode",
    "loopback",
    "--passphrase-fd",
    "0",
    "--no-symkey-cache",
];

/// AES256 symmetric encryption through the `gpg` binary.
#[derive(Clone)]
pub struct GpgCipher {
    program: PathBuf,
    home: Option<PathBuf>,
    runner: Arc<dyn CommandRunner>,
    timeout: Option<Duration>,
}

impl GpgCipher {
    /// Uses `gpg` from `PATH` with the default home directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("gpg"),
            home: None,
            runner: Arc::new(SystemRunner),
            timeout: None,
        }
    }

    /// Uses a specific `gpg` binary.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Passes `--homedir`, isolating the run from the user's keyring.
    #[must_use]
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// Replaces the process runner.
    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Kills the tool if it runs longer than `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn invoke(
        &self,
        decrypt: bool,
        input: &Path,
        output: &Path,
        passphrase: &Passphrase,
    ) -> Result<(), CipherError> {
        let request = ToolRequest {
            runner: self.runner.as_ref(),
            program: &self.program,
            timeout: self.timeout,
            input,
            output,
            passphrase,
        };

        run_tool(&request, |program| {
            let mut invocation = ToolInvocation::new(program);
            if let Some(home) = &self.home {
                invocation = invocation.arg("--homedir").arg(home);
            }
            invocation = invocation.args(BATCH_ARGS);
            if !decrypt {
                invocation = invocation.args(["--cipher-algo", "AES256"]);
            }
            invocation
                .arg("--output")
                .arg(output)
                .arg(if decrypt { "--decrypt" } else { "--symmetric" })
                .arg(input)
        })
    }
}

impl Default for GpgCipher {
    fn default() -> Self {
        Self::new()
    }
}

impl Cipher for GpgCipher {
    fn method(&self) -> EncryptionMethod {
        EncryptionMethod::Gpg
    }

    fn encrypt(
        &self,
        input: &Path,
        output: &Path,
        passphrase: &Passphrase,
    ) -> Result<(), CipherError> {
        self.invoke(false, input, output, passphrase)
    }

    fn decrypt(
        &self,
        input: &Path,
        output: &Path,
        passphrase: &Passphrase,
    ) -> Result<(), CipherError> {
        self.invoke(true, input, output, passphrase)
    }
}
