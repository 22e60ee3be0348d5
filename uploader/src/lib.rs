//! Debian changes-manifest uploader.
//!
//! This crate validates `.changes` manifests against architecture and
//! distribution whitelists, stages the accepted binary packages with a
//! rewritten manifest, and hands the staged transaction to a remote pending
//! area through a copy-then-rename protocol. It backs the `apt-upload` binary
//! and can be driven programmatically with a scripted command executor.
//!
//! # Modules
//!
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Whitelists, remote endpoint and naming settings
//! - [`error`] - Error taxonomy for validation, staging and transfer
//! - [`executor`] - External command execution with timeouts
//! - [`manifest`] - Manifest line classification, artefact policy and rewriting
//! - [`output`] - Progress and summary text for the operator
//! - [`stager`] - Scoped staging directories
//! - [`transaction`] - Transaction identifiers and remote layout
//! - [`transfer`] - Remote copy, rename and stamp steps
//! - [`upload`] - Manifest discovery and the per-manifest pipeline

pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod manifest;
pub mod output;
pub mod stager;
pub mod transaction;
pub mod transfer;
pub mod upload;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
