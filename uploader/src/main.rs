//! `apt-upload` CLI entrypoint.
//!
//! Uploads every changes manifest found in a source directory to the remote
//! pending area, printing progress to stderr. The process exits with status 1
//! when the arguments are wrong, the configuration cannot be loaded, or any
//! manifest fails.

use apt_upload::cli::Cli;
use apt_upload::config::UploadConfig;
use apt_upload::error::{Result, UploadError};
use apt_upload::executor::SystemCommandExecutor;
use apt_upload::output::{failure_line, write_stderr_line};
use apt_upload::transaction::SystemIdSource;
use apt_upload::upload::{BatchSummary, UploadContext, run_batch};
use clap::Parser;
use std::ffi::OsString;
use std::io::Write;

fn main() {
    let mut stderr = std::io::stderr();
    let run_result = parse_args(std::env::args_os()).and_then(|cli| run(&cli, &mut stderr));
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Parses the command line. `--help` and `--version` print and exit 0 here;
/// any other parse failure becomes [`UploadError::InvalidArgument`].
fn parse_args<I, T>(args: I) -> Result<Cli>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::try_parse_from(args).map_err(|err| {
        if !err.use_stderr() {
            err.exit();
        }
        UploadError::InvalidArgument {
            reason: err.render().to_string().trim_end().to_owned(),
        }
    })
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<BatchSummary> {
    let config = UploadConfig::resolve(cli.config.as_deref())?;
    let executor = SystemCommandExecutor::new(config.command_timeout());
    let context = UploadContext {
        config: &config,
        executor: &executor,
        ids: &SystemIdSource,
        dry_run: cli.dry_run,
        keep_going: cli.keep_going,
        quiet: cli.quiet,
    };

    let summary = run_batch(&context, &cli.source_dir, stderr)?;
    report_summary(&context, &summary, stderr);
    Ok(summary)
}

/// Prints failures, and the whole summary when running with `--keep-going`.
fn report_summary(context: &UploadContext<'_>, summary: &BatchSummary, stderr: &mut dyn Write) {
    if context.keep_going {
        if !context.quiet || !summary.is_success() {
            write_stderr_line(stderr, "");
            write_stderr_line(stderr, summary.display_text());
        }
        return;
    }
    for failure in &summary.failed {
        write_stderr_line(stderr, format!("error: {}", failure_line(failure)));
    }
}

fn exit_code_for_run_result(result: Result<BatchSummary>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(summary) if summary.is_success() => 0,
        Ok(_) => 1,
        Err(err) => {
            write_stderr_line(stderr, err);
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use rstest::{fixture, rstest};
    use std::fs;
    use tempfile::TempDir;

    struct Scratch {
        _temp: TempDir,
        config: Utf8PathBuf,
        source_dir: Utf8PathBuf,
    }

    #[fixture]
    fn scratch() -> Scratch {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("utf-8 temp path");
        let config = root.join("config.toml");
        fs::write(&config, "").expect("write config");
        let source_dir = root.join("builds");
        fs::create_dir(&source_dir).expect("create source dir");
        Scratch {
            _temp: temp,
            config,
            source_dir,
        }
    }

    fn cli_for(scratch: &Scratch, source_dir: Utf8PathBuf) -> Cli {
        Cli {
            source_dir,
            config: Some(scratch.config.clone()),
            dry_run: true,
            keep_going: false,
            quiet: false,
        }
    }

    #[test]
    fn exit_code_for_run_result_returns_zero_on_success() {
        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Ok(BatchSummary::default()), &mut stderr);
        assert_eq!(exit_code, 0);
        assert!(stderr.is_empty());
    }

    #[test]
    fn exit_code_for_run_result_prints_error_and_returns_one() {
        let err = UploadError::SourceDirNotFound {
            path: Utf8PathBuf::from("/no/such/dir"),
        };

        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Err(err), &mut stderr);
        assert_eq!(exit_code, 1);

        let stderr_text = String::from_utf8(stderr).expect("stderr was not UTF-8");
        assert!(stderr_text.contains("/no/such/dir"));
    }

    #[rstest]
    fn run_reports_a_missing_source_directory(scratch: Scratch) {
        let cli = cli_for(&scratch, scratch.source_dir.join("absent"));

        let result = run(&cli, &mut Vec::new());

        assert!(matches!(result, Err(UploadError::SourceDirNotFound { .. })));
    }

    #[rstest]
    fn run_succeeds_on_an_empty_directory(scratch: Scratch) {
        let cli = cli_for(&scratch, scratch.source_dir.clone());

        let summary = run(&cli, &mut Vec::new()).expect("empty batch should succeed");

        assert!(summary.is_success());
        assert!(summary.completed.is_empty());
    }

    #[rstest]
    #[case::abort(false)]
    #[case::keep_going(true)]
    fn rejected_manifest_fails_the_run(scratch: Scratch, #[case] keep_going: bool) {
        fs::write(scratch.source_dir.join("src.changes"), "Architecture: source\n")
            .expect("write manifest");
        let cli = Cli {
            keep_going,
            ..cli_for(&scratch, scratch.source_dir.clone())
        };
        let mut stderr = Vec::new();

        let result = run(&cli, &mut stderr);
        let exit_code = exit_code_for_run_result(result, &mut stderr);

        assert_eq!(exit_code, 1);
        let text = String::from_utf8(stderr).expect("utf-8 stderr");
        assert!(text.contains("src.changes"));
        assert_eq!(text.contains("manifest(s) uploaded"), keep_going);
    }

    #[rstest]
    #[case::missing_directory(&["apt-upload"])]
    #[case::extra_argument(&["apt-upload", "a", "b"])]
    fn wrong_arity_is_an_invalid_argument(#[case] argv: &[&str]) {
        let err = parse_args(argv).expect_err("arity should be enforced");

        let UploadError::InvalidArgument { reason } = &err else {
            panic!("expected InvalidArgument, got {err:?}");
        };
        assert!(reason.contains("Usage: apt-upload"), "unexpected usage: {reason}");

        let mut stderr = Vec::new();
        assert_eq!(exit_code_for_run_result(Err(err), &mut stderr), 1);
    }

    #[test]
    fn parse_args_accepts_one_directory() {
        let cli = parse_args(["apt-upload", "/srv/builds"]).expect("one directory is valid");
        assert_eq!(cli.source_dir, Utf8PathBuf::from("/srv/builds"));
    }
}
