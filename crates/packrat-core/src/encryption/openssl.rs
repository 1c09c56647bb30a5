//! `openssl enc` adapter.

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

/// Cipher and key-derivation arguments shared by both directions.
const CIPHER_ARGS: [&str; 8] = [
    "-aes-256-cbc",
    "-md",
    "sha512",
    "-pbkdf2",
    "-iter",
    "10000",
    "-salt",
    "-pass",
];

/// AES-256-CBC encryption through the `openssl` binary.
///
/// Files written by this adapter can be opened by hand with
/// `openssl enc -d -aes-256-cbc -md sha512 -pbkdf2 -iter 10000 -salt`.
#[derive(Clone)]
pub struct OpenSslCipher {
    program: PathBuf,
    runner: Arc<dyn CommandRunner>,
    timeout: Option<Duration>,
}

impl OpenSslCipher {
    /// Uses `openssl` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("openssl"),
            runner: Arc::new(SystemRunner),
            timeout: None,
        }
    }

    /// Uses a specific `openssl` binary.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
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
            let mut invocation = ToolInvocation::new(program).arg("enc");
            if decrypt {
                invocation = invocation.arg("-d");
            }
            invocation
                .args(CIPHER_ARGS)
                .arg("stdin")
                .arg("-in")
                .arg(input)
                .arg("-out")
                .arg(output)
        })
    }
}

impl Default for OpenSslCipher {
    fn default() -> Self {
        Self::new()
    }
}

impl Cipher for OpenSslCipher {
    fn method(&self) -> EncryptionMethod {
        EncryptionMethod::OpenSsl
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
