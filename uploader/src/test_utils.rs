//! Shared test utilities for the upload crate.

use crate::error::{Result, UploadError};
use crate::executor::{CommandExecutor, render_command};
use crate::transaction::{IdSource, TransactionId};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::process::{ExitStatus, Output};

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with empty stdout and stderr.
#[must_use]
pub fn success_output() -> Output {
    Output {
        status: exit_status(0),
        stdout: Vec::new(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
#[must_use]
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Wildcard accepted in [`ExpectedCall::args`].
pub const ANY_ARG: &str = "*";

/// Represents an expected command invocation for testing.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The program to execute (e.g., "rsync").
    pub cmd: &'static str,
    /// The arguments to pass to the program. An argument of
    /// [`ANY_ARG`] matches any value.
    pub args: Vec<&'static str>,
    /// The result to return when this command is invoked.
    pub result: Result<Output>,
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Records expected command invocations and returns predefined results,
/// allowing tests to verify the transfer sequence without side effects.
/// Mismatches are reported as [`UploadError::StubMismatch`] so they surface
/// through the code under test.
#[derive(Debug)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
    invoked: RefCell<Vec<String>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    #[must_use]
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
            invoked: RefCell::new(Vec::new()),
        }
    }

    /// Returns the command lines invoked so far, in order.
    #[must_use]
    pub fn invoked(&self) -> Vec<String> {
        self.invoked.borrow().clone()
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        assert!(
            self.expected.borrow().is_empty(),
            "expected no further command invocations"
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, program: &str, args: &[String]) -> Result<Output> {
        self.invoked
            .borrow_mut()
            .push(render_command(program, args));
        let Some(call) = self.expected.borrow_mut().pop_front() else {
            return Err(UploadError::StubMismatch {
                message: format!("unexpected command invocation: {program} {args:?}"),
            });
        };

        if call.cmd != program || !args_match(&call.args, args) {
            return Err(UploadError::StubMismatch {
                message: format!(
                    "expected {} {:?}, got {program} {args:?}",
                    call.cmd, call.args
                ),
            });
        }

        call.result
    }
}

fn args_match(expected: &[&str], actual: &[String]) -> bool {
    expected.len() == actual.len()
        && expected
            .iter()
            .zip(actual)
            .all(|(e, a)| *e == ANY_ARG || *e == a.as_str())
}

/// Hands out a scripted sequence of transaction ids.
#[derive(Debug)]
pub struct FixedIds {
    ids: RefCell<VecDeque<&'static str>>,
}

impl FixedIds {
    /// Creates a source returning `ids` in order.
    #[must_use]
    pub fn new(ids: &[&'static str]) -> Self {
        Self {
            ids: RefCell::new(ids.iter().copied().collect()),
        }
    }
}

impl IdSource for FixedIds {
    fn next_id(&self, _builder: &str) -> Result<TransactionId> {
        let next = self.ids.borrow_mut().pop_front();
        match next {
            Some(id) => TransactionId::parse(id),
            None => Err(UploadError::StubMismatch {
                message: "no transaction ids left".to_owned(),
            }),
        }
    }
}
