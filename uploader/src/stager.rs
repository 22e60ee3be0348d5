//! Scoped staging directories for a single upload.
//!
//! A [`StagingArea`] owns a freshly created temporary directory that holds the
//! rewritten manifest and every accepted artefact. The directory is removed
//! when the area is dropped, on success and failure alike.

use crate::error::{Result, UploadError};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tempfile::TempDir;

const STAGING_PREFIX: &str = ".apt-upload-";

/// Temporary directory assembling one transaction's files.
#[derive(Debug)]
pub struct StagingArea {
    path: Utf8PathBuf,
    // Dropping the handle removes the directory tree.
    _dir: TempDir,
}

impl StagingArea {
    /// Creates a new, empty staging directory inside `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::StagingFailed`] if the directory cannot be
    /// created, or [`UploadError::NonUtf8Path`] if its path is not UTF-8.
    pub fn create_in(parent: &Utf8Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(parent)
            .map_err(|e| UploadError::StagingFailed {
                reason: format!("failed to create staging directory in {parent}: {e}"),
            })?;
        let path = Utf8PathBuf::try_from(dir.path().to_path_buf()).map_err(|e| {
            UploadError::NonUtf8Path {
                path: e.into_path_buf().display().to_string(),
            }
        })?;
        log::debug!("created staging directory {path}");
        Ok(Self { path, _dir: dir })
    }

    /// Creates a staging directory next to the manifest's source directory.
    ///
    /// The parent is the manifest's grandparent so the copies stay on the
    /// same filesystem as the artefacts.
    ///
    /// # Errors
    ///
    /// See [`Self::create_in`].
    pub fn for_manifest(manifest: &Utf8Path) -> Result<Self> {
        Self::create_in(&staging_parent(manifest))
    }

    /// Returns the staging directory path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns where a file with the given name lands inside the area.
    #[must_use]
    pub fn target_for(&self, file_name: &str) -> Utf8PathBuf {
        self.path.join(file_name)
    }

    /// Copies `source` into the area under its own file name.
    ///
    /// If a file with that name is already staged, nothing is copied and the
    /// existing path is returned.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::StagingFailed`] if `source` has no file name or
    /// the copy fails.
    pub fn copy_into(&self, source: &Utf8Path) -> Result<Utf8PathBuf> {
        let file_name = source
            .file_name()
            .ok_or_else(|| UploadError::StagingFailed {
                reason: format!("{source} does not name a file"),
            })?;
        let target = self.target_for(file_name);

        if target.exists() {
            log::trace!("{file_name} already staged; skipping copy");
            return Ok(target);
        }

        fs::copy(source, &target).map_err(|e| UploadError::StagingFailed {
            reason: format!("failed to copy {source} to {target}: {e}"),
        })?;
        log::debug!("staged {source} as {target}");
        Ok(target)
    }

    /// Opens the area to readers regardless of the caller's umask.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::StagingFailed`] if the mode cannot be changed.
    #[cfg(unix)]
    pub fn finalize_permissions(&self) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        fs::set_permissions(&self.path, fs::Permissions::from_mode(0o755)).map_err(|e| {
            UploadError::StagingFailed {
                reason: format!("failed to set permissions on {}: {e}", self.path),
            }
        })
    }

    /// Opens the area to readers regardless of the caller's umask.
    ///
    /// # Errors
    ///
    /// Never fails on platforms without Unix permission bits.
    #[cfg(not(unix))]
    pub fn finalize_permissions(&self) -> Result<()> {
        Ok(())
    }

    /// Lists the staged file names in sorted order.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Io`] if the directory cannot be read.
    pub fn file_names(&self) -> Result<Vec<String>> {
        let mut names = fs::read_dir(&self.path)?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<std::io::Result<Vec<_>>>()?;
        names.sort();
        Ok(names)
    }
}

/// Returns the directory that hosts staging areas for `manifest`.
///
/// This is the manifest's grandparent, with `dirname` semantics: an empty
/// parent becomes `.` and the root is its own parent.
#[must_use]
pub fn staging_parent(manifest: &Utf8Path) -> Utf8PathBuf {
    dirname(&dirname(manifest))
}

fn dirname(path: &Utf8Path) -> Utf8PathBuf {
    match path.parent() {
        None => path.to_owned(),
        Some(parent) if parent.as_str().is_empty() => Utf8PathBuf::from("."),
        Some(parent) => parent.to_owned(),
    }
}
