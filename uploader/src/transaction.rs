//! Transaction identifiers and the remote pending-area layout.
//!
//! A transaction id is embedded verbatim in remote paths and in the `ssh`
//! command that renames the in-flight directory, so it is restricted to
//! `[A-Za-z0-9_-]` and checked after every generation.

use crate::error::{Result, UploadError};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use std::fmt;

/// Suffix marking a transaction directory that is still being transferred.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Opaque identifier for one upload attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionId(String);

impl TransactionId {
    /// Validates an identifier string.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::IdentifierFormat`] if the string is empty or
    /// contains characters outside `[A-Za-z0-9_-]`.
    pub fn parse(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if valid {
            Ok(Self(id))
        } else {
            Err(UploadError::IdentifierFormat { id })
        }
    }

    /// Builds an identifier from its components.
    ///
    /// The layout is `{%Y%m%d_%H%M%S}_{builder}_{host}_{pid}_{random:08x}`.
    /// Only the short host name (before the first dot) is used.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::IdentifierFormat`] if any component introduces a
    /// character outside `[A-Za-z0-9_-]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use apt_upload::transaction::TransactionId;
    /// use chrono::{TimeZone, Utc};
    ///
    /// let at = Utc.with_ymd_and_hms(2014, 10, 2, 13, 5, 9).unwrap();
    /// let id = TransactionId::compose(at, "apt-builder", "build01.example.com", 4242, 0xbeef)?;
    /// assert_eq!(id.as_str(), "20141002_130509_apt-builder_build01_4242_0000beef");
    /// # Ok::<(), apt_upload::error::UploadError>(())
    /// ```
    pub fn compose(
        timestamp: DateTime<Utc>,
        builder: &str,
        host: &str,
        pid: u32,
        random: u32,
    ) -> Result<Self> {
        let short_host = host.split('.').next().unwrap_or(host);
        Self::parse(format!(
            "{}_{builder}_{short_host}_{pid}_{random:08x}",
            timestamp.format("%Y%m%d_%H%M%S")
        ))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TransactionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mints a fresh transaction id from the clock, host, pid and random entropy.
///
/// # Errors
///
/// Returns [`UploadError::IdentifierFormat`] if the host name or builder
/// identity produced an id with unexpected characters. A host name that is
/// not valid UTF-8 fails the same way.
pub fn generate_id(builder: &str) -> Result<TransactionId> {
    let host = gethostname::gethostname().to_string_lossy().into_owned();
    let id = TransactionId::compose(
        Utc::now(),
        builder,
        &host,
        std::process::id(),
        rand::random::<u32>(),
    )?;
    log::debug!("generated transaction id {id}");
    Ok(id)
}

/// Source of transaction ids for an upload run.
pub trait IdSource {
    /// Mints the id for the next manifest.
    ///
    /// # Errors
    ///
    /// Returns an error if no valid id can be produced.
    fn next_id(&self, builder: &str) -> Result<TransactionId>;
}

/// Mints ids with [`generate_id`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemIdSource;

impl IdSource for SystemIdSource {
    fn next_id(&self, builder: &str) -> Result<TransactionId> {
        generate_id(builder)
    }
}

/// Paths of a transaction inside the remote pending area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLayout {
    root: Utf8PathBuf,
}

impl RemoteLayout {
    /// Creates a layout rooted at the given pending-uploads directory.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the pending-uploads root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Returns the directory a completed transaction occupies.
    #[must_use]
    pub fn final_path(&self, id: &TransactionId) -> Utf8PathBuf {
        self.root.join(id.as_str())
    }

    /// Returns the directory used while the transfer is in flight.
    #[must_use]
    pub fn temp_path(&self, id: &TransactionId) -> Utf8PathBuf {
        self.root.join(format!("{id}{TEMP_SUFFIX}"))
    }
}
