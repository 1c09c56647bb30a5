//! Process execution seam for external encryption tools.
//!
//! Cipher adapters never spawn processes themselves; they describe a
//! [`ToolInvocation`] and hand it to a [`CommandRunner`]. Production code
//! uses [`SystemRunner`]; tests substitute a recording fake.

use std::ffi::OsString;
use std::fmt;
use std::io::ErrorKind;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::Child;
use std::process::Command;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use wait_timeout::ChildExt;

/// Stderr beyond this many bytes is dropped.
const MAX_STDERR_SIZE: u64 = 64 * 1024;

/// Errors raised while running an external tool.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// The program could not be found.
    #[error("program not found: {program}")]
    NotFound {
        /// Program that was requested.
        program: PathBuf,
    },

    /// The program exists but could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        /// Program that was requested.
        program: PathBuf,
        /// Underlying cause.
        #[source]
        source: std::io::Error,
    },

    /// The program did not finish in time and was killed.
    #[error("{program} did not finish within {}s", .timeout.as_secs())]
    TimedOut {
        /// Program that was killed.
        program: PathBuf,
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// Talking to the running process failed.
    #[error("I/O error while running {program}: {source}")]
    Io {
        /// Program being run.
        program: PathBuf,
        /// Underlying cause.
        #[source]
        source: std::io::Error,
    },
}

/// A fully described external command.
#[derive(Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    /// Resolved program path.
    pub program: PathBuf,
    /// Command-line arguments.
    pub args: Vec<OsString>,
    /// Bytes written to the child's stdin, which is then closed. `None`
    /// connects stdin to null.
    pub stdin: Option<Vec<u8>>,
}

impl ToolInvocation {
    /// Creates an invocation with no arguments and no stdin.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the bytes fed to stdin.
    #[must_use]
    pub fn stdin(mut self, input: Vec<u8>) -> Self {
        self.stdin = Some(input);
        self
    }

    /// Returns the arguments as lossy strings, for assertions and logs.
    #[must_use]
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

// stdin usually carries a passphrase
impl fmt::Debug for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolInvocation")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("stdin", &self.stdin.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Result of a finished tool run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Whether the tool exited successfully.
    pub success: bool,
    /// Exit code, if the tool exited normally.
    pub code: Option<i32>,
    /// Captured standard error (lossy UTF-8, truncated).
    pub stderr: String,
}

/// Locates and runs external programs.
pub trait CommandRunner: Send + Sync {
    /// Resolves `program` to an executable path, or `None` if it is not
    /// available on this host.
    fn locate(&self, program: &Path) -> Option<PathBuf>;

    /// Runs the invocation to completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be started, its pipes fail,
    /// or it exceeds `timeout`. A non-zero exit is *not* an error; it is
    /// reported through [`ToolOutput::success`].
    fn run(
        &self,
        invocation: &ToolInvocation,
        timeout: Option<Duration>,
    ) -> Result<ToolOutput, RunnerError>;
}

/// Runs real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn locate(&self, program: &Path) -> Option<PathBuf> {
        if program.components().count() > 1 {
            return program.is_file().then(|| program.to_path_buf());
        }
        which::which(program).ok()
    }

    fn run(
        &self,
        invocation: &ToolInvocation,
        timeout: Option<Duration>,
    ) -> Result<ToolOutput, RunnerError> {
        let program = &invocation.program;
        debug!(program = %program.display(), args = ?invocation.args, "running external tool");

        let mut child = Command::new(program)
            .args(&invocation.args)
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| {
                if source.kind() == ErrorKind::NotFound {
                    RunnerError::NotFound {
                        program: program.clone(),
                    }
                } else {
                    RunnerError::Spawn {
                        program: program.clone(),
                        source,
                    }
                }
            })?;

        // Drain stderr concurrently so a chatty tool cannot block on a full
        // pipe while we wait for it.
        let stderr_thread = child.stderr.take().map(|stderr| {
            std::thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = stderr.take(MAX_STDERR_SIZE).read_to_end(&mut buf);
                buf
            })
        });

        if let Some(input) = &invocation.stdin
            && let Some(mut pipe) = child.stdin.take()
            && let Err(source) = pipe.write_all(input)
            && source.kind() != ErrorKind::BrokenPipe
        {
            reap(&mut child);
            return Err(RunnerError::Io {
                program: program.clone(),
                source,
            });
        }

        let status = match timeout {
            Some(limit) => child.wait_timeout(limit),
            None => child.wait().map(Some),
        };

        let status = match status {
            Ok(Some(status)) => status,
            Ok(None) => {
                reap(&mut child);
                return Err(RunnerError::TimedOut {
                    program: program.clone(),
                    timeout: timeout.unwrap_or_default(),
                });
            }
            Err(source) => {
                reap(&mut child);
                return Err(RunnerError::Io {
                    program: program.clone(),
                    source,
                });
            }
        };

        let stderr = stderr_thread
            .and_then(|t| t.join().ok())
            .map(|buf| String::from_utf8_lossy(&buf).trim().to_string())
            .unwrap_or_default();

        Ok(ToolOutput {
            success: status.success(),
            code: status.code(),
            stderr,
        })
    }
}

fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
