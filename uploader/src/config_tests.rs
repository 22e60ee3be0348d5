//! Unit tests for configuration loading and validation.

use super::*;
use rstest::rstest;
use tempfile::TempDir;

fn origin() -> Utf8PathBuf {
    Utf8PathBuf::from("config.toml")
}

#[rstest]
fn defaults_match_the_repository_baseline() {
    let config = UploadConfig::default();

    assert_eq!(config.architectures, vec!["amd64"]);
    assert_eq!(
        config.distributions,
        vec!["lucid", "precise", "trusty", "utopic"]
    );
    assert_eq!(config.builder, "apt-builder");
    assert_eq!(config.manifest_suffix, ".changes");
    assert_eq!(config.remote.pending_root, "/data/uploads/pending");
    assert_eq!(config.remote.ssh_target(), "apt-upload@apt.example.org");
}

#[rstest]
fn empty_file_yields_defaults() {
    let config = UploadConfig::from_toml("", &origin()).expect("empty config should parse");
    assert_eq!(config, UploadConfig::default());
}

#[rstest]
fn whitelists_can_be_extended() {
    let source = concat!(
        "architectures = [\"amd64\", \"arm64\"]\n",
        "distributions = [\"trusty\", \"xenial\"]\n",
        "[remote]\n",
        "host = \"apt.internal\"\n",
    );

    let config = UploadConfig::from_toml(source, &origin()).expect("config should parse");

    assert_eq!(config.architectures, vec!["amd64", "arm64"]);
    assert_eq!(config.distributions, vec!["trusty", "xenial"]);
    assert_eq!(config.remote.host, "apt.internal");
    assert_eq!(config.remote.user, "apt-upload");
}

#[rstest]
fn pending_root_is_read_as_a_path() {
    let source = "[remote]\npending_root = \"/srv/apt/incoming\"\n";

    let config = UploadConfig::from_toml(source, &origin()).expect("config should parse");

    assert_eq!(
        config.remote.pending_root,
        Utf8PathBuf::from("/srv/apt/incoming")
    );
}

#[rstest]
fn unknown_keys_are_rejected() {
    let err = UploadConfig::from_toml("archs = [\"amd64\"]\n", &origin())
        .expect_err("unknown key should fail");
    assert!(matches!(err, UploadError::InvalidConfig { .. }));
}

#[rstest]
#[case::empty_architectures("architectures = []\n", "architectures")]
#[case::empty_distributions("distributions = []\n", "distributions")]
#[case::quoted_host("[remote]\nhost = \"apt'; rm -rf /\"\n", "remote.host")]
#[case::relative_root("[remote]\npending_root = \"uploads\"\n", "pending_root")]
#[case::quoted_root("[remote]\npending_root = \"/data/it's\"\n", "pending_root")]
#[case::nested_stamp("stamp_file = \"a/b\"\n", "stamp_file")]
#[case::dotted_builder("builder = \"ci.builder\"\n", "builder")]
#[case::zero_timeout("command_timeout_secs = 0\n", "command_timeout_secs")]
fn invalid_values_are_rejected(#[case] source: &str, #[case] field: &str) {
    let err = UploadConfig::from_toml(source, &origin()).expect_err("config should be rejected");
    let UploadError::InvalidConfig { reason, .. } = err else {
        panic!("expected InvalidConfig, got {err:?}");
    };
    assert!(reason.contains(field), "reason {reason:?} should name {field}");
}

#[rstest]
#[case::plain("upload.stamp", true)]
#[case::empty("", false)]
#[case::dot(".", false)]
#[case::parent("..", false)]
#[case::nested("dir/upload.stamp", false)]
fn plain_file_names_are_recognised(#[case] name: &str, #[case] expected: bool) {
    assert_eq!(is_plain_file_name(name), expected);
}

#[rstest]
fn explicit_missing_file_is_an_error() {
    let temp = TempDir::new().expect("temp dir");
    let path = Utf8PathBuf::try_from(temp.path().join("missing.toml")).expect("utf-8 path");

    let err = UploadConfig::resolve(Some(&path)).expect_err("missing explicit config");
    assert!(matches!(err, UploadError::InvalidConfig { path: p, .. } if p == path));
}

#[rstest]
fn environment_variable_selects_the_file() {
    let temp = TempDir::new().expect("temp dir");
    let path = temp.path().join("upload.toml");
    std::fs::write(&path, "builder = \"ci-builder\"\n").expect("write config");

    let config = temp_env::with_var(CONFIG_ENV_VAR, Some(path.as_os_str()), || {
        UploadConfig::resolve(None)
    })
    .expect("config from env should load");

    assert_eq!(config.builder, "ci-builder");
}

#[rstest]
fn explicit_path_wins_over_environment() {
    let temp = TempDir::new().expect("temp dir");
    let env_path = temp.path().join("env.toml");
    let flag_path = temp.path().join("flag.toml");
    std::fs::write(&env_path, "builder = \"from-env\"\n").expect("write env config");
    std::fs::write(&flag_path, "builder = \"from-flag\"\n").expect("write flag config");
    let flag_path = Utf8PathBuf::try_from(flag_path).expect("utf-8 path");

    let config = temp_env::with_var(CONFIG_ENV_VAR, Some(env_path.as_os_str()), || {
        UploadConfig::resolve(Some(&flag_path))
    })
    .expect("config from flag should load");

    assert_eq!(config.builder, "from-flag");
}

#[rstest]
fn command_timeout_is_expressed_in_seconds() {
    let config = UploadConfig {
        command_timeout_secs: 90,
        ..UploadConfig::default()
    };
    assert_eq!(config.command_timeout(), Duration::from_secs(90));
}
