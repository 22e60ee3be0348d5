//! Accept/drop/reject policy for artefacts referenced by a manifest.

use std::fmt;

/// What to do with a referenced artefact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtefactAction {
    /// Stage the artefact and keep its manifest line.
    Keep,
    /// Omit the artefact and remove its manifest line.
    Drop,
    /// Reject the whole manifest; source uploads are unsupported.
    Fatal,
}

impl fmt::Display for ArtefactAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Keep => "keep",
            Self::Drop => "drop",
            Self::Fatal => "fatal",
        };
        f.write_str(label)
    }
}

const BINARY_SUFFIX: &str = ".deb";
const DEBUG_SYMBOLS_SUFFIX: &str = ".ddeb";
const SOURCE_SUFFIXES: [&str; 2] = [".dsc", ".tar.gz"];

/// Decides the fate of an artefact from its file-name suffix.
///
/// Binary packages are kept, source artefacts are fatal, and everything else
/// (debug symbols, build logs, `.buildinfo`) is dropped.
///
/// # Examples
///
/// ```
/// use apt_upload::manifest::policy::{ArtefactAction, classify};
///
/// assert_eq!(classify("hello_1.0_amd64.deb"), ArtefactAction::Keep);
/// assert_eq!(classify("hello-dbgsym_1.0_amd64.ddeb"), ArtefactAction::Drop);
/// assert_eq!(classify("hello_1.0.tar.gz"), ArtefactAction::Fatal);
/// ```
#[must_use]
pub fn classify(file_name: &str) -> ArtefactAction {
    if file_name.ends_with(BINARY_SUFFIX) {
        ArtefactAction::Keep
    } else if file_name.ends_with(DEBUG_SYMBOLS_SUFFIX) {
        ArtefactAction::Drop
    } else if SOURCE_SUFFIXES
        .iter()
        .any(|suffix| file_name.ends_with(suffix))
    {
        ArtefactAction::Fatal
    } else {
        ArtefactAction::Drop
    }
}
