//! Test fakes and archive inspection helpers.
//!
//! # Panics
//!
//! Helpers panic on I/O errors; they are only compiled for tests.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use crate::encryption::Cipher;
use crate::encryption::CipherError;
use crate::encryption::EncryptionMethod;
use crate::encryption::Passphrase;
use crate::encryption::runner::CommandRunner;
use crate::encryption::runner::RunnerError;
use crate::encryption::runner::ToolInvocation;
use crate::encryption::runner::ToolOutput;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

/// Lists member names in archive order.
pub fn zip_member_names(archive: &Path) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

/// Reads one member as UTF-8.
pub fn read_member(archive: &Path, name: &str) -> String {
    let mut archive = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
    let mut member = archive.by_name(name).unwrap();
    let mut content = String::new();
    member.read_to_string(&mut content).unwrap();
    content
}

#[derive(Debug, Clone)]
enum Behavior {
    Succeed,
    Missing,
    Fail { code: i32, stderr: String },
    TimeOut,
}

/// A `CommandRunner` that records invocations instead of spawning.
///
/// On `Succeed` and `Fail` it writes a few bytes to the path following
/// `-out` / `--output`, imitating a tool that produced (partial) output.
#[derive(Debug)]
pub struct RecordingRunner {
    behavior: Behavior,
    calls: Mutex<Vec<ToolInvocation>>,
}

impl RecordingRunner {
    fn with(behavior: Behavior) -> Self {
        Self {
            behavior,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn succeeding() -> Self {
        Self::with(Behavior::Succeed)
    }

    pub fn missing() -> Self {
        Self::with(Behavior::Missing)
    }

    pub fn failing(code: i32, stderr: &str) -> Self {
        Self::with(Behavior::Fail {
            code,
            stderr: stderr.to_string(),
        })
    }

    pub fn timing_out() -> Self {
        Self::with(Behavior::TimeOut)
    }

    pub fn calls(&self) -> Vec<ToolInvocation> {
        self.calls.lock().unwrap().clone()
    }
}

fn output_arg(invocation: &ToolInvocation) -> Option<PathBuf> {
    invocation
        .args
        .windows(2)
        .find(|w| w[0] == "-out" || w[0] == "--output")
        .map(|w| PathBuf::from(&w[1]))
}

impl CommandRunner for RecordingRunner {
    fn locate(&self, program: &Path) -> Option<PathBuf> {
        match self.behavior {
            Behavior::Missing => None,
            _ => Some(program.to_path_buf()),
        }
    }

    fn run(
        &self,
        invocation: &ToolInvocation,
        timeout: Option<Duration>,
    ) -> Result<ToolOutput, RunnerError> {
        self.calls.lock().unwrap().push(invocation.clone());
        if let Some(out) = output_arg(invocation) {
            std::fs::write(out, b"tool output").unwrap();
        }

        match &self.behavior {
            Behavior::Succeed => Ok(ToolOutput {
                success: true,
                code: Some(0),
                stderr: String::new(),
            }),
            Behavior::Fail { code, stderr } => Ok(ToolOutput {
                success: false,
                code: Some(*code),
                stderr: stderr.clone(),
            }),
            Behavior::Missing => Err(RunnerError::NotFound {
                program: invocation.program.clone(),
            }),
            Behavior::TimeOut => Err(RunnerError::TimedOut {
                program: invocation.program.clone(),
                timeout: timeout.unwrap_or_default(),
            }),
        }
    }
}

/// A reversible in-process cipher: XORs every byte with the first byte of
/// the passphrase. Good enough to exercise the pipeline without tools.
#[derive(Debug, Default)]
pub struct XorCipher {
    fail: bool,
}

impl XorCipher {
    pub fn failing() -> Self {
        Self { fail: true }
    }

    fn apply(&self, input: &Path, output: &Path, passphrase: &Passphrase) -> Result<(), CipherError> {
        if self.fail {
            return Err(CipherError::ToolMissing {
                program: PathBuf::from("xor"),
            });
        }
        let key = passphrase.expose().as_bytes().first().copied().unwrap_or(0);
        let data: Vec<u8> = std::fs::read(input).unwrap().iter().map(|b| b ^ key).collect();
        std::fs::write(output, data).unwrap();
        Ok(())
    }
}

impl Cipher for XorCipher {
    fn method(&self) -> EncryptionMethod {
        EncryptionMethod::OpenSsl
    }

    fn encrypt(&self, input: &Path, output: &Path, passphrase: &Passphrase) -> Result<(), CipherError> {
        self.apply(input, output, passphrase)
    }

    fn decrypt(&self, input: &Path, output: &Path, passphrase: &Passphrase) -> Result<(), CipherError> {
        self.apply(input, output, passphrase)
    }
}
