//! Tests for argument parsing.

use super::*;
use clap::error::ErrorKind;
use rstest::rstest;

#[test]
fn cli_parses_a_source_directory() {
    let cli = Cli::parse_from(["apt-upload", "/srv/builds/hello"]);
    assert_eq!(cli.source_dir, Utf8PathBuf::from("/srv/builds/hello"));
    assert!(cli.config.is_none());
    assert!(!cli.dry_run);
    assert!(!cli.keep_going);
    assert!(!cli.quiet);
}

#[test]
fn cli_parses_flags() {
    let cli = Cli::parse_from([
        "apt-upload",
        "--config",
        "/etc/apt-upload.toml",
        "--dry-run",
        "--keep-going",
        "-q",
        "builds",
    ]);
    assert_eq!(cli.config, Some(Utf8PathBuf::from("/etc/apt-upload.toml")));
    assert!(cli.dry_run);
    assert!(cli.keep_going);
    assert!(cli.quiet);
    assert_eq!(cli.source_dir, Utf8PathBuf::from("builds"));
}

#[rstest]
#[case::no_arguments(&["apt-upload"], ErrorKind::MissingRequiredArgument)]
#[case::two_arguments(&["apt-upload", "a", "b"], ErrorKind::UnknownArgument)]
fn cli_requires_exactly_one_directory(#[case] argv: &[&str], #[case] kind: ErrorKind) {
    let err = Cli::try_parse_from(argv).expect_err("arity should be enforced");
    assert_eq!(err.kind(), kind);
}

#[test]
fn cli_usage_names_the_source_directory() {
    let err = Cli::try_parse_from(["apt-upload"]).expect_err("missing argument");
    assert!(err.to_string().contains("<SOURCE_DIR>"));
}
