//! Streaming validation and rewriting of a changes manifest.
//!
//! The manifest is read line by line and copied into the staging area.
//! Declarations are checked against the whitelists, file references are run
//! through the artefact policy, and dropped artefacts lose their lines.

use super::Whitelists;
use super::line::{FileReference, LineKind, classify_line};
use super::policy::{ArtefactAction, classify};
use crate::config::is_plain_file_name;
use crate::error::{Result, SourceOrigin, UploadError};
use crate::stager::StagingArea;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};

const SOURCE_ARCHITECTURE: &str = "source";

/// Outcome of processing one manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedManifest {
    /// The rewritten manifest inside the staging area.
    pub manifest: Utf8PathBuf,
    /// Every staged file, manifest first, without duplicates.
    pub files: Vec<Utf8PathBuf>,
    /// Artefacts whose lines were removed, without duplicates.
    pub dropped: Vec<String>,
    /// Architectures declared by the manifest.
    pub architectures: Vec<String>,
    /// Distributions declared by the manifest.
    pub distributions: Vec<String>,
}

impl ProcessedManifest {
    /// Returns the staged artefacts, excluding the manifest itself.
    pub fn artefacts(&self) -> impl Iterator<Item = &Utf8Path> {
        self.files.iter().skip(1).map(Utf8PathBuf::as_path)
    }
}

/// Validates `manifest_path`, stages its accepted artefacts and writes the
/// rewritten manifest into `staging`.
///
/// Artefacts are resolved against the manifest's directory. Processing stops
/// at the first invalid line; the caller discards the staging area.
///
/// # Errors
///
/// Returns [`UploadError::UnsupportedSourcePackage`],
/// [`UploadError::InvalidArchitecture`], [`UploadError::InvalidDistribution`]
/// or [`UploadError::UnsafeFileName`] for invalid content, and I/O or staging
/// errors when reading, writing or copying fails.
pub fn process(
    manifest_path: &Utf8Path,
    staging: &StagingArea,
    whitelists: &Whitelists,
) -> Result<ProcessedManifest> {
    let manifest_name = manifest_path
        .file_name()
        .ok_or_else(|| UploadError::StagingFailed {
            reason: format!("{manifest_path} does not name a file"),
        })?;
    let base_dir = manifest_path.parent().unwrap_or_else(|| Utf8Path::new(""));
    let out_path = staging.target_for(manifest_name);

    log::debug!("processing {manifest_path} into {out_path}");

    let reader = BufReader::new(File::open(manifest_path)?);
    let mut writer = BufWriter::new(File::create(&out_path)?);
    let mut state = RewriteState::new(out_path.clone());

    for line in reader.lines() {
        let line = line?;
        if let Some(kept) = state.rewrite_line(&line, base_dir, staging, whitelists)? {
            writeln!(writer, "{kept}")?;
        }
    }
    writer.flush()?;

    Ok(state.finish(out_path))
}

struct RewriteState {
    files: Vec<Utf8PathBuf>,
    dropped: Vec<String>,
    architectures: Vec<String>,
    distributions: Vec<String>,
}

impl RewriteState {
    fn new(manifest: Utf8PathBuf) -> Self {
        Self {
            files: vec![manifest],
            dropped: Vec::new(),
            architectures: Vec::new(),
            distributions: Vec::new(),
        }
    }

    /// Returns the line to emit, or `None` when the line is dropped.
    fn rewrite_line<'l>(
        &mut self,
        line: &'l str,
        base_dir: &Utf8Path,
        staging: &StagingArea,
        whitelists: &Whitelists,
    ) -> Result<Option<&'l str>> {
        match classify_line(line) {
            LineKind::Architecture(tokens) => {
                check_architectures(&tokens, &whitelists.architectures)?;
                self.architectures = to_owned(&tokens);
                Ok(Some(line))
            }
            LineKind::Distribution(tokens) => {
                check_distributions(&tokens, &whitelists.distributions)?;
                self.distributions = to_owned(&tokens);
                Ok(Some(line))
            }
            LineKind::FileReference(reference) => {
                self.apply_policy(line, &reference, base_dir, staging)
            }
            LineKind::Opaque => Ok(Some(line)),
        }
    }

    fn apply_policy<'l>(
        &mut self,
        line: &'l str,
        reference: &FileReference<'_>,
        base_dir: &Utf8Path,
        staging: &StagingArea,
    ) -> Result<Option<&'l str>> {
        let name = reference.file_name;
        match classify(name) {
            ArtefactAction::Keep => {
                if !is_plain_file_name(name) {
                    return Err(UploadError::UnsafeFileName {
                        name: name.to_owned(),
                    });
                }
                let staged = staging.copy_into(&base_dir.join(name))?;
                if !self.files.contains(&staged) {
                    self.files.push(staged);
                }
                Ok(Some(line))
            }
            ArtefactAction::Drop => {
                log::trace!("dropping {name}");
                if !self.dropped.iter().any(|d| d == name) {
                    self.dropped.push(name.to_owned());
                }
                Ok(None)
            }
            ArtefactAction::Fatal => Err(UploadError::UnsupportedSourcePackage {
                origin: SourceOrigin::Artefact(name.to_owned()),
            }),
        }
    }

    fn finish(self, manifest: Utf8PathBuf) -> ProcessedManifest {
        ProcessedManifest {
            manifest,
            files: self.files,
            dropped: self.dropped,
            architectures: self.architectures,
            distributions: self.distributions,
        }
    }
}

/// Checks architecture tokens against the whitelist.
///
/// # Errors
///
/// Returns [`UploadError::UnsupportedSourcePackage`] if `source` is present,
/// otherwise [`UploadError::InvalidArchitecture`] naming every token outside
/// the whitelist.
pub fn check_architectures(tokens: &[&str], allowed: &[String]) -> Result<()> {
    if tokens.contains(&SOURCE_ARCHITECTURE) {
        return Err(UploadError::UnsupportedSourcePackage {
            origin: SourceOrigin::Architecture,
        });
    }
    let invalid = outside(tokens, allowed);
    if invalid.is_empty() {
        Ok(())
    } else {
        Err(UploadError::InvalidArchitecture { invalid })
    }
}

/// Checks distribution tokens against the whitelist.
///
/// # Errors
///
/// Returns [`UploadError::InvalidDistribution`] naming every token outside the
/// whitelist.
pub fn check_distributions(tokens: &[&str], allowed: &[String]) -> Result<()> {
    let invalid = outside(tokens, allowed);
    if invalid.is_empty() {
        Ok(())
    } else {
        Err(UploadError::InvalidDistribution { invalid })
    }
}

fn outside(tokens: &[&str], allowed: &[String]) -> Vec<String> {
    let mut invalid: Vec<String> = Vec::new();
    for token in tokens {
        if !allowed.iter().any(|a| a == token) && !invalid.iter().any(|i| i == token) {
            invalid.push((*token).to_owned());
        }
    }
    invalid
}

fn to_owned(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|t| (*t).to_owned()).collect()
}

#[cfg(test)]
#[path = "rewriter_tests.rs"]
mod tests;
