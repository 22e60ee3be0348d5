//! Changes-manifest handling.
//!
//! - [`line`] - classifies individual manifest lines
//! - [`policy`] - decides whether a referenced artefact is kept
//! - [`rewriter`] - validates a manifest and stages its accepted artefacts

pub mod line;
pub mod policy;
pub mod rewriter;

pub use rewriter::{ProcessedManifest, process};

use crate::config::UploadConfig;

/// Architectures and distributions a manifest may declare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Whitelists {
    /// Accepted `Architecture:` tokens.
    pub architectures: Vec<String>,
    /// Accepted `Distribution:` tokens.
    pub distributions: Vec<String>,
}

impl From<&UploadConfig> for Whitelists {
    fn from(config: &UploadConfig) -> Self {
        Self {
            architectures: config.architectures.clone(),
            distributions: config.distributions.clone(),
        }
    }
}

impl Default for Whitelists {
    fn default() -> Self {
        Self::from(&UploadConfig::default())
    }
}
