//! CLI argument definitions for the apt upload tool.
//!
//! Kept apart from the binary entrypoint so argument parsing can be tested
//! without spawning the process.

use camino::Utf8PathBuf;
use clap::Parser;

/// Stage Debian changes manifests and queue them for the apt repository.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "apt-upload")]
#[command(version, about)]
#[command(long_about = concat!(
    "Stage Debian changes manifests and queue them for the apt repository.\n\n",
    "Every *.changes file in SOURCE_DIR is validated against the configured ",
    "architecture and distribution whitelists. Binary packages are staged ",
    "alongside a rewritten manifest; debug-symbol packages are dropped and ",
    "source packages are rejected. The staged transaction is copied to the ",
    "remote pending area under a temporary name and renamed into place once ",
    "the copy is complete.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Upload every manifest in a build directory:\n",
    "    $ apt-upload /srv/builds/hello\n\n",
    "  Check what would be uploaded:\n",
    "    $ apt-upload --dry-run /srv/builds/hello\n\n",
    "  Continue past rejected manifests:\n",
    "    $ apt-upload --keep-going /srv/builds/nightly",
))]
pub struct Cli {
    /// Directory containing the manifests to upload.
    #[arg(value_name = "SOURCE_DIR")]
    pub source_dir: Utf8PathBuf,

    /// Configuration file [default: $APT_UPLOAD_CONFIG or platform config dir].
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Validate and stage manifests without transferring anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Continue with the remaining manifests after a failure.
    #[arg(long)]
    pub keep_going: bool,

    /// Suppress progress output (errors still shown).
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
