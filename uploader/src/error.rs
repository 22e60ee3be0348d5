//! Error types for the apt upload tool.
//!
//! Every failure aborts processing of the manifest that raised it. Variants
//! carry enough context for the operator to see which token, artefact or
//! command was responsible.

use camino::Utf8PathBuf;
use std::fmt;
use thiserror::Error;

/// Where a rejected source package was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOrigin {
    /// The `Architecture:` line listed the `source` pseudo-architecture.
    Architecture,
    /// A file reference named a source artefact (`.dsc` or `.tar.gz`).
    Artefact(String),
}

impl fmt::Display for SourceOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Architecture => write!(f, "architecture \"source\""),
            Self::Artefact(name) => write!(f, "artefact {name:?}"),
        }
    }
}

/// Errors that can occur while staging or transferring an upload.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The command line could not be parsed.
    #[error("{reason}")]
    InvalidArgument {
        /// Description of the problem, usually clap's rendered usage.
        reason: String,
    },

    /// The manifest describes a source package, which cannot be uploaded.
    #[error("source packages are not supported: {origin}")]
    UnsupportedSourcePackage {
        /// What identified the manifest as a source upload.
        origin: SourceOrigin,
    },

    /// The `Architecture:` line named architectures outside the whitelist.
    #[error("invalid or unknown architecture(s): {}", invalid.join(", "))]
    InvalidArchitecture {
        /// The offending tokens, in manifest order.
        invalid: Vec<String>,
    },

    /// The `Distribution:` line named distributions outside the whitelist.
    #[error("invalid or unknown distribution(s): {}", invalid.join(", "))]
    InvalidDistribution {
        /// The offending tokens, in manifest order.
        invalid: Vec<String>,
    },

    /// A generated transaction id contained characters outside `[A-Za-z0-9_-]`.
    #[error("transaction id contains unexpected characters: {id:?}")]
    IdentifierFormat {
        /// The rejected identifier.
        id: String,
    },

    /// An external command exited unsuccessfully.
    #[error("command failed with {}: {command}{}", describe_status(*status), describe_message(message))]
    ExternalCommandFailed {
        /// The rendered command line.
        command: String,
        /// Exit code, or `None` when terminated by a signal.
        status: Option<i32>,
        /// Trimmed standard error of the command.
        message: String,
    },

    /// An external command did not finish within the configured timeout.
    #[error("command timed out after {timeout_secs} seconds: {command}")]
    CommandTimedOut {
        /// The rendered command line.
        command: String,
        /// The timeout that expired.
        timeout_secs: u64,
    },

    /// A kept file reference does not name a plain file in the manifest directory.
    #[error("file reference {name:?} is not a plain file name")]
    UnsafeFileName {
        /// The file name as written in the manifest.
        name: String,
    },

    /// The staging directory could not be prepared or populated.
    #[error("staging failed: {reason}")]
    StagingFailed {
        /// Description of the staging failure.
        reason: String,
    },

    /// The source directory given on the command line is unusable.
    #[error("source directory {path} does not exist or is not a directory")]
    SourceDirNotFound {
        /// The directory that was requested.
        path: Utf8PathBuf,
    },

    /// The configuration file could not be read, parsed or validated.
    #[error("invalid configuration at {path}: {reason}")]
    InvalidConfig {
        /// Path of the configuration file.
        path: Utf8PathBuf,
        /// Description of the problem.
        reason: String,
    },

    /// A filesystem path was not valid UTF-8.
    #[error("path is not valid UTF-8: {path}")]
    NonUtf8Path {
        /// Lossy rendering of the path.
        path: String,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Test stub received an unexpected or mismatched command invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

impl UploadError {
    /// Returns true when the error stems from manifest content rather than I/O
    /// or the remote side.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedSourcePackage { .. }
                | Self::InvalidArchitecture { .. }
                | Self::InvalidDistribution { .. }
                | Self::UnsafeFileName { .. }
        )
    }
}

fn describe_status(status: Option<i32>) -> String {
    status.map_or_else(|| "signal".to_owned(), |code| format!("status {code}"))
}

fn describe_message(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!(" ({message})")
    }
}

/// Result type alias using [`UploadError`].
pub type Result<T> = std::result::Result<T, UploadError>;
