//! Upload configuration backed by an optional TOML file.
//!
//! The whitelists, remote endpoint and naming constants all live here so an
//! operator can extend them without touching the manifest parser. Every field
//! has a default, so an empty or missing file yields a working configuration.

use crate::error::{Result, UploadError};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::time::Duration;

/// Environment variable consulted when `--config` is not given.
pub const CONFIG_ENV_VAR: &str = "APT_UPLOAD_CONFIG";

const CONFIG_FILENAME: &str = "config.toml";

/// Top-level configuration for a run.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    /// Architectures accepted on the `Architecture:` line.
    pub architectures: Vec<String>,
    /// Distributions accepted on the `Distribution:` line.
    pub distributions: Vec<String>,
    /// Builder identity embedded in every transaction id.
    pub builder: String,
    /// File-name suffix identifying manifests in the source directory.
    pub manifest_suffix: String,
    /// Name of the marker file touched in the source directory on success.
    pub stamp_file: String,
    /// Whether the marker file is touched through `sudo`.
    pub stamp_with_sudo: bool,
    /// Upper bound for each external command, in seconds.
    pub command_timeout_secs: u64,
    /// Remote endpoint receiving the upload.
    pub remote: RemoteConfig,
}

/// Remote host and pending-area settings.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteConfig {
    /// Login used for `rsync` and `ssh`.
    pub user: String,
    /// Host name of the repository server.
    pub host: String,
    /// Absolute directory on the host holding pending transactions.
    pub pending_root: Utf8PathBuf,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            architectures: vec!["amd64".to_owned()],
            distributions: ["lucid", "precise", "trusty", "utopic"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            builder: "apt-builder".to_owned(),
            manifest_suffix: ".changes".to_owned(),
            stamp_file: "upload.stamp".to_owned(),
            stamp_with_sudo: true,
            command_timeout_secs: 30 * 60,
            remote: RemoteConfig::default(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            user: "apt-upload".to_owned(),
            host: "apt.example.org".to_owned(),
            pending_root: Utf8PathBuf::from("/data/uploads/pending"),
        }
    }
}

impl RemoteConfig {
    /// Returns the `user@host` target used by both `ssh` and `rsync`.
    #[must_use]
    pub fn ssh_target(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }
}

impl UploadConfig {
    /// Parses and validates configuration from TOML text.
    ///
    /// `origin` is only used to label errors.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::InvalidConfig`] when the text is not valid TOML,
    /// contains unknown keys, or fails validation.
    pub fn from_toml(contents: &str, origin: &Utf8Path) -> Result<Self> {
        let config: Self = toml::from_str(contents).map_err(|e| UploadError::InvalidConfig {
            path: origin.to_owned(),
            reason: e.message().to_owned(),
        })?;
        config.validate(origin)?;
        Ok(config)
    }

    /// Loads configuration from an explicit path.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::InvalidConfig`] if the file cannot be read or is
    /// invalid.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| UploadError::InvalidConfig {
            path: path.to_owned(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&contents, path)
    }

    /// Resolves and loads the configuration for a run.
    ///
    /// An explicit path (from `--config` or [`CONFIG_ENV_VAR`]) must exist.
    /// The per-user default location is optional and falls back to built-in
    /// defaults when absent.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::InvalidConfig`] if a selected file is missing or
    /// invalid.
    pub fn resolve(explicit: Option<&Utf8Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        if let Some(path) = env_config_path() {
            return Self::load(&path);
        }
        match default_config_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => {
                log::debug!("no configuration file found; using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Returns the timeout applied to each external command.
    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    fn validate(&self, origin: &Utf8Path) -> Result<()> {
        let invalid = |reason: String| UploadError::InvalidConfig {
            path: origin.to_owned(),
            reason,
        };

        if self.architectures.is_empty() {
            return Err(invalid("architectures must not be empty".to_owned()));
        }
        if self.distributions.is_empty() {
            return Err(invalid("distributions must not be empty".to_owned()));
        }
        if self.manifest_suffix.is_empty() {
            return Err(invalid("manifest_suffix must not be empty".to_owned()));
        }
        if self.builder.contains('.') || !is_shell_word(&self.builder) {
            return Err(invalid(format!(
                "builder must be non-empty and contain only [A-Za-z0-9_-], got {:?}",
                self.builder
            )));
        }
        for (field, value) in [
            ("remote.user", self.remote.user.as_str()),
            ("remote.host", self.remote.host.as_str()),
        ] {
            if !is_shell_word(value) {
                return Err(invalid(format!(
                    "{field} must be non-empty and contain only [A-Za-z0-9_.-], got {value:?}"
                )));
            }
        }
        if !is_plain_file_name(&self.stamp_file) {
            return Err(invalid(format!(
                "stamp_file must be a plain file name, got {:?}",
                self.stamp_file
            )));
        }
        let root = self.remote.pending_root.as_str();
        if !self.remote.pending_root.is_absolute()
            || !root.chars().all(|c| is_shell_word_char(c) || c == '/')
        {
            return Err(invalid(format!(
                "remote.pending_root must be absolute and contain only [A-Za-z0-9_./-], got {root:?}"
            )));
        }
        if self.command_timeout_secs == 0 {
            return Err(invalid("command_timeout_secs must be positive".to_owned()));
        }
        Ok(())
    }
}

/// Returns true when `name` names a single file with no directory component.
#[must_use]
pub fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\', '\0'])
}

fn is_shell_word(value: &str) -> bool {
    !value.is_empty() && value.chars().all(is_shell_word_char)
}

fn is_shell_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

fn env_config_path() -> Option<Utf8PathBuf> {
    std::env::var(CONFIG_ENV_VAR)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(Utf8PathBuf::from)
}

/// Returns the per-user default configuration path, if one can be determined.
#[must_use]
pub fn default_config_path() -> Option<Utf8PathBuf> {
    directories_next::ProjectDirs::from("", "", "apt-upload")
        .and_then(|dirs| Utf8PathBuf::try_from(dirs.config_dir().to_path_buf()).ok())
        .map(|dir| dir.join(CONFIG_FILENAME))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
