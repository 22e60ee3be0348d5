//! Operator-facing progress and summary text.
//!
//! Everything here is written to the error stream; stdout is left to `rsync`
//! so its progress output stays readable.

use crate::upload::{BatchSummary, ManifestFailure, UploadReport};
use camino::Utf8Path;
use std::io::Write;

/// Writes a line to the given stream, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

/// Announces that a manifest is about to be processed.
#[must_use]
pub fn processing_message(manifest: &Utf8Path) -> String {
    format!("Processing {manifest}:")
}

/// Lists one staged artefact under the processing header.
#[must_use]
pub fn staged_artefact_line(artefact: &Utf8Path) -> String {
    format!("\t{artefact}")
}

/// Announces the transfer of a staged transaction.
#[must_use]
pub fn uploading_message(file_count: usize, temp_path: &Utf8Path, host: &str) -> String {
    format!("Uploading {file_count} files to {temp_path} on {host} ...")
}

/// Announces the remote rename into the pending area.
#[must_use]
pub fn queuing_message() -> &'static str {
    "Queuing for upload ..."
}

/// Reports a successfully transferred manifest.
#[must_use]
pub fn done_message(manifest: &Utf8Path) -> String {
    format!("Done uploading {manifest}.")
}

/// Reports what a dry run would have transferred.
#[must_use]
pub fn dry_run_message(report: &UploadReport, host: &str) -> String {
    let mut text = format!(
        "Dry run - would upload {} files to {} on {host}:",
        report.staged.len(),
        report.plan.temp_path
    );
    for name in &report.staged {
        text.push_str("\n  - ");
        text.push_str(name);
    }
    for name in &report.dropped {
        text.push_str("\n  (dropped) ");
        text.push_str(name);
    }
    text
}

/// Describes a failed manifest in one line.
#[must_use]
pub fn failure_line(failure: &ManifestFailure) -> String {
    format!(
        "{} [{}]: {}",
        failure.manifest, failure.kind, failure.error
    )
}

impl BatchSummary {
    /// Formats the batch outcome for display.
    #[must_use]
    pub fn display_text(&self) -> String {
        let mut text = format!(
            "{} manifest(s) uploaded, {} failed",
            self.completed.len(),
            self.failed.len()
        );
        for report in &self.completed {
            text.push_str(&format!("\n  ok   {} -> {}", report.manifest, report.id));
        }
        for failure in &self.failed {
            text.push_str("\n  FAIL ");
            text.push_str(&failure_line(failure));
        }
        text
    }
}
