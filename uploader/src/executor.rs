//! External command execution.
//!
//! The transfer step shells out to `rsync`, `ssh` and `touch`. Routing every
//! invocation through [`CommandExecutor`] keeps the staging and transfer logic
//! testable without a network or a remote host.

use crate::error::{Result, UploadError};
use std::io::Read;
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::Duration;
use wait_timeout::ChildExt;

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs a command with arguments and returns its exit status and stderr.
    ///
    /// # Errors
    ///
    /// Returns any I/O errors encountered while spawning or running the
    /// command, or [`UploadError::CommandTimedOut`] if it does not finish.
    fn run(&self, program: &str, args: &[String]) -> Result<Output>;
}

/// Executes commands on the host system with a per-command timeout.
///
/// Standard output is inherited so `rsync` progress reaches the operator;
/// standard error is captured for error reporting.
#[derive(Debug, Clone, Copy)]
pub struct SystemCommandExecutor {
    timeout: Duration,
}

impl SystemCommandExecutor {
    /// Creates an executor that kills commands running longer than `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, program: &str, args: &[String]) -> Result<Output> {
        log::debug!("running {}", render_command(program, args));

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drain stderr concurrently so a chatty child cannot block on a full pipe.
        let stderr_reader = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                pipe.read_to_end(&mut buf).map(|_| buf)
            })
        });

        let Some(status) = child.wait_timeout(self.timeout)? else {
            if child.kill().is_err() {
                log::warn!("failed to kill timed-out {program}");
            }
            if child.wait().is_err() {
                log::warn!("failed to reap timed-out {program}");
            }
            return Err(UploadError::CommandTimedOut {
                command: render_command(program, args),
                timeout_secs: self.timeout.as_secs(),
            });
        };

        let stderr = match stderr_reader {
            Some(handle) => handle
                .join()
                .map_err(|_| std::io::Error::other("stderr reader panicked"))??,
            None => Vec::new(),
        };

        Ok(Output {
            status,
            stdout: Vec::new(),
            stderr,
        })
    }
}

/// Runs a command and maps a non-zero exit to [`UploadError::ExternalCommandFailed`].
///
/// # Errors
///
/// Propagates executor errors and reports unsuccessful exits.
pub fn run_checked(executor: &dyn CommandExecutor, program: &str, args: &[String]) -> Result<()> {
    let output = executor.run(program, args)?;
    if output.status.success() {
        return Ok(());
    }
    Err(UploadError::ExternalCommandFailed {
        command: render_command(program, args),
        status: output.status.code(),
        message: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
    })
}

/// Renders a command line for logs and error messages.
#[must_use]
pub fn render_command(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}
