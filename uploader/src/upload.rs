//! Manifest discovery and the per-manifest upload pipeline.
//!
//! Each manifest moves through parsing, staging and transfer on its own
//! transaction id and staging directory. A failure at any stage ends that
//! manifest's run and is reported as a [`ManifestFailure`] tagged with the
//! stage that failed; the staging directory is removed either way.

use crate::config::UploadConfig;
use crate::error::{Result, UploadError};
use crate::executor::CommandExecutor;
use crate::manifest::{ProcessedManifest, Whitelists, process};
use crate::output::{
    done_message, dry_run_message, processing_message, queuing_message, staged_artefact_line,
    uploading_message, write_stderr_line,
};
use crate::stager::StagingArea;
use crate::transaction::{IdSource, TransactionId};
use crate::transfer::{Transfer, TransferPlan};
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;
use std::fs;
use std::io::Write;

/// Settings shared by every manifest in a run.
pub struct UploadContext<'a> {
    /// Loaded configuration.
    pub config: &'a UploadConfig,
    /// Runner for `rsync`, `ssh` and `touch`.
    pub executor: &'a dyn CommandExecutor,
    /// Source of transaction ids.
    pub ids: &'a dyn IdSource,
    /// Stage and report without running any external command.
    pub dry_run: bool,
    /// Continue with the next manifest after a failure.
    pub keep_going: bool,
    /// Suppress progress output.
    pub quiet: bool,
}

/// Terminal failure states of a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The manifest failed validation.
    RejectedInvalid,
    /// Assembling the staging directory failed.
    StagingFailed,
    /// Copying, renaming or stamping failed.
    TransferFailed,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RejectedInvalid => "rejected-invalid",
            Self::StagingFailed => "staging-failed",
            Self::TransferFailed => "transfer-failed",
        };
        f.write_str(name)
    }
}

/// A manifest that did not complete.
#[derive(Debug)]
pub struct ManifestFailure {
    /// The manifest that failed.
    pub manifest: Utf8PathBuf,
    /// Stage at which it failed.
    pub kind: FailureKind,
    /// The underlying error.
    pub error: UploadError,
}

/// A manifest that was staged and, unless this was a dry run, transferred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    /// The source manifest.
    pub manifest: Utf8PathBuf,
    /// Transaction id the manifest was uploaded under.
    pub id: TransactionId,
    /// Remote locations for the transaction.
    pub plan: TransferPlan,
    /// Names of the staged files, manifest first.
    pub staged: Vec<String>,
    /// Artefacts removed from the manifest.
    pub dropped: Vec<String>,
    /// Whether the transfer was skipped.
    pub dry_run: bool,
}

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Manifests that completed, in processing order.
    pub completed: Vec<UploadReport>,
    /// Manifests that failed, in processing order.
    pub failed: Vec<ManifestFailure>,
}

impl BatchSummary {
    /// Returns `true` when no manifest failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Lists the manifests in `dir` ending with `suffix`, sorted by name.
///
/// Only regular files (or symlinks to them) are returned; entries whose names
/// are not UTF-8 are skipped.
///
/// # Errors
///
/// Returns [`UploadError::SourceDirNotFound`] if `dir` is not a directory, or
/// an I/O error if it cannot be read.
pub fn discover_manifests(dir: &Utf8Path, suffix: &str) -> Result<Vec<Utf8PathBuf>> {
    if !dir.is_dir() {
        return Err(UploadError::SourceDirNotFound {
            path: dir.to_owned(),
        });
    }

    let mut manifests = Vec::new();
    for entry in fs::read_dir(dir)? {
        let file_name = entry?.file_name();
        let Some(name) = file_name.to_str() else {
            log::debug!("skipping non-UTF-8 entry in {dir}");
            continue;
        };
        if !name.ends_with(suffix) {
            continue;
        }
        let path = dir.join(name);
        if path.is_file() {
            manifests.push(path);
        }
    }
    manifests.sort();
    Ok(manifests)
}

/// Processes every manifest in `dir`.
///
/// Without `keep_going` the batch stops after the first failure; the summary
/// then holds the manifests completed so far and that one failure.
///
/// # Errors
///
/// Returns an error only if discovery fails. Per-manifest failures are
/// recorded in the summary.
pub fn run_batch(
    context: &UploadContext<'_>,
    dir: &Utf8Path,
    stderr: &mut dyn Write,
) -> Result<BatchSummary> {
    let manifests = discover_manifests(dir, &context.config.manifest_suffix)?;
    log::debug!("found {} manifest(s) in {dir}", manifests.len());

    let mut summary = BatchSummary::default();
    for manifest in manifests {
        match upload_manifest(context, &manifest, stderr) {
            Ok(report) => summary.completed.push(report),
            Err(failure) => {
                summary.failed.push(failure);
                if !context.keep_going {
                    break;
                }
            }
        }
    }
    Ok(summary)
}

/// Runs one manifest from id generation through to the stamp file.
///
/// # Errors
///
/// Returns a [`ManifestFailure`] naming the stage that failed.
pub fn upload_manifest(
    context: &UploadContext<'_>,
    manifest: &Utf8Path,
    stderr: &mut dyn Write,
) -> std::result::Result<UploadReport, ManifestFailure> {
    let fail = |kind| failure(manifest, kind);

    let id = context
        .ids
        .next_id(&context.config.builder)
        .map_err(fail(FailureKind::StagingFailed))?;
    let staging =
        StagingArea::for_manifest(manifest).map_err(fail(FailureKind::StagingFailed))?;

    if !context.quiet {
        write_stderr_line(stderr, processing_message(manifest));
    }

    let whitelists = Whitelists::from(context.config);
    let processed = process(manifest, &staging, &whitelists).map_err(|error| {
        let kind = if error.is_validation() {
            FailureKind::RejectedInvalid
        } else {
            FailureKind::StagingFailed
        };
        fail(kind)(error)
    })?;

    if !context.quiet {
        for file in &processed.files {
            write_stderr_line(stderr, staged_artefact_line(file));
        }
    }

    staging
        .finalize_permissions()
        .map_err(fail(FailureKind::StagingFailed))?;

    let transfer = Transfer::from_config(context.config);
    let report = build_report(manifest, id, &transfer, &processed, context.dry_run);

    if context.dry_run {
        if !context.quiet {
            write_stderr_line(stderr, dry_run_message(&report, &context.config.remote.host));
        }
        return Ok(report);
    }

    send(context, &transfer, &staging, &report, stderr)
        .map_err(fail(FailureKind::TransferFailed))?;

    if !context.quiet {
        write_stderr_line(stderr, done_message(manifest));
    }
    Ok(report)
}

fn failure(manifest: &Utf8Path, kind: FailureKind) -> impl FnOnce(UploadError) -> ManifestFailure {
    let path = manifest.to_owned();
    move |error| ManifestFailure {
        manifest: path,
        kind,
        error,
    }
}

fn send(
    context: &UploadContext<'_>,
    transfer: &Transfer,
    staging: &StagingArea,
    report: &UploadReport,
    stderr: &mut dyn Write,
) -> Result<()> {
    if !context.quiet {
        write_stderr_line(
            stderr,
            uploading_message(
                report.staged.len(),
                &report.plan.temp_path,
                &context.config.remote.host,
            ),
        );
    }
    transfer.push(context.executor, staging.path(), &report.plan)?;

    if !context.quiet {
        write_stderr_line(stderr, queuing_message());
    }
    transfer.commit(context.executor, &report.plan)?;

    let source_dir = report
        .manifest
        .parent()
        .filter(|p| !p.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    transfer.mark_uploaded(context.executor, source_dir)
}

fn build_report(
    manifest: &Utf8Path,
    id: TransactionId,
    transfer: &Transfer,
    processed: &ProcessedManifest,
    dry_run: bool,
) -> UploadReport {
    let staged = processed
        .files
        .iter()
        .filter_map(|f| f.file_name().map(str::to_owned))
        .collect();
    UploadReport {
        manifest: manifest.to_owned(),
        plan: transfer.plan(&id),
        id,
        staged,
        dropped: processed.dropped.clone(),
        dry_run,
    }
}

#[cfg(test)]
#[path = "upload_tests.rs"]
mod tests;
