//! Two-phase hand-off of a staged transaction to the remote pending area.
//!
//! The staging directory is copied to `<root>/<id>.tmp` and then renamed to
//! `<root>/<id>` in a single remote `mv`, so consumers of the pending area
//! never observe a partially transferred transaction. A failed step leaves the
//! temporary directory behind for an operator to inspect; nothing is retried.

use crate::config::UploadConfig;
use crate::error::Result;
use crate::executor::{CommandExecutor, run_checked};
use crate::transaction::{RemoteLayout, TransactionId};
use camino::{Utf8Path, Utf8PathBuf};

/// Remote endpoint and local marker settings for a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    ssh_target: String,
    layout: RemoteLayout,
    stamp_file: String,
    stamp_with_sudo: bool,
}

/// Remote locations used by one transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    /// In-flight directory receiving the copy.
    pub temp_path: Utf8PathBuf,
    /// Final directory the transaction is renamed to.
    pub final_path: Utf8PathBuf,
}

impl Transfer {
    /// Builds a transfer from the run configuration.
    #[must_use]
    pub fn from_config(config: &UploadConfig) -> Self {
        Self {
            ssh_target: config.remote.ssh_target(),
            layout: RemoteLayout::new(config.remote.pending_root.clone()),
            stamp_file: config.stamp_file.clone(),
            stamp_with_sudo: config.stamp_with_sudo,
        }
    }

    /// Returns the `user@host` target.
    #[must_use]
    pub fn ssh_target(&self) -> &str {
        &self.ssh_target
    }

    /// Returns the remote paths for a transaction.
    #[must_use]
    pub fn plan(&self, id: &TransactionId) -> TransferPlan {
        TransferPlan {
            temp_path: self.layout.temp_path(id),
            final_path: self.layout.final_path(id),
        }
    }

    /// Copies the staging directory contents to the in-flight remote path.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::UploadError::ExternalCommandFailed`] if `rsync`
    /// exits unsuccessfully, or the executor's error if it cannot run.
    pub fn push(
        &self,
        executor: &dyn CommandExecutor,
        staging_dir: &Utf8Path,
        plan: &TransferPlan,
    ) -> Result<()> {
        let args = vec![
            "-dtP".to_owned(),
            format!("{staging_dir}/"),
            format!("{}:{}/", self.ssh_target, plan.temp_path),
        ];
        run_checked(executor, "rsync", &args)
    }

    /// Atomically renames the in-flight directory to its final name.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::UploadError::ExternalCommandFailed`] if the
    /// remote `mv` fails.
    pub fn commit(&self, executor: &dyn CommandExecutor, plan: &TransferPlan) -> Result<()> {
        let args = vec![
            self.ssh_target.clone(),
            format!("mv '{}' '{}'", plan.temp_path, plan.final_path),
        ];
        run_checked(executor, "ssh", &args)
    }

    /// Touches the marker file in the manifest's source directory.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::UploadError::ExternalCommandFailed`] if `touch`
    /// fails.
    pub fn mark_uploaded(
        &self,
        executor: &dyn CommandExecutor,
        source_dir: &Utf8Path,
    ) -> Result<()> {
        let stamp = source_dir.join(&self.stamp_file).into_string();
        if self.stamp_with_sudo {
            run_checked(executor, "sudo", &["touch".to_owned(), stamp])
        } else {
            run_checked(executor, "touch", &[stamp])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UploadError;
    use crate::test_utils::{failure_output, success_output};
    use mockall::{Sequence, mock};
    use rstest::{fixture, rstest};
    use std::process::Output;

    mock! {
        Executor {}

        impl CommandExecutor for Executor {
            fn run(&self, program: &str, args: &[String]) -> Result<Output>;
        }
    }

    const ID: &str = "20141002_130509_apt-builder_ci_42_0000beef";

    #[fixture]
    fn transfer() -> Transfer {
        Transfer::from_config(&UploadConfig::default())
    }

    fn id() -> TransactionId {
        TransactionId::parse(ID).expect("valid id")
    }

    #[rstest]
    fn plan_uses_temp_suffix_under_the_pending_root(transfer: Transfer) {
        let plan = transfer.plan(&id());

        assert_eq!(plan.temp_path, format!("/data/uploads/pending/{ID}.tmp"));
        assert_eq!(plan.final_path, format!("/data/uploads/pending/{ID}"));
    }

    #[rstest]
    fn push_then_commit_issue_rsync_and_remote_mv(transfer: Transfer) {
        let plan = transfer.plan(&id());
        let mut executor = MockExecutor::new();
        let mut seq = Sequence::new();

        let expected_rsync = vec![
            "-dtP".to_owned(),
            "/tmp/stage/".to_owned(),
            format!("apt-upload@apt.example.org:/data/uploads/pending/{ID}.tmp/"),
        ];
        executor
            .expect_run()
            .withf(move |program, args| program == "rsync" && args == expected_rsync.as_slice())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(success_output()));

        let expected_mv =
            format!("mv '/data/uploads/pending/{ID}.tmp' '/data/uploads/pending/{ID}'");
        executor
            .expect_run()
            .withf(move |program, args| {
                program == "ssh"
                    && args.len() == 2
                    && args[0] == "apt-upload@apt.example.org"
                    && args[1] == expected_mv
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(success_output()));

        transfer
            .push(&executor, Utf8Path::new("/tmp/stage"), &plan)
            .expect("push should succeed");
        transfer.commit(&executor, &plan).expect("commit should succeed");
    }

    #[rstest]
    fn failed_push_surfaces_the_rsync_error(transfer: Transfer) {
        let plan = transfer.plan(&id());
        let mut executor = MockExecutor::new();
        executor
            .expect_run()
            .withf(|program, _| program == "rsync")
            .times(1)
            .returning(|_, _| Ok(failure_output("rsync: connection unexpectedly closed")));

        let err = transfer
            .push(&executor, Utf8Path::new("/tmp/stage"), &plan)
            .expect_err("push should fail");

        assert!(matches!(
            err,
            UploadError::ExternalCommandFailed { ref command, status: Some(1), ref message }
                if command.starts_with("rsync -dtP") && message.contains("unexpectedly closed")
        ));
    }

    #[rstest]
    #[case::with_sudo(true, "sudo", vec!["touch", "/srv/builds/hello/upload.stamp"])]
    #[case::without_sudo(false, "touch", vec!["/srv/builds/hello/upload.stamp"])]
    fn mark_uploaded_touches_the_stamp(
        #[case] with_sudo: bool,
        #[case] program: &'static str,
        #[case] expected_args: Vec<&'static str>,
    ) {
        let config = UploadConfig {
            stamp_with_sudo: with_sudo,
            ..UploadConfig::default()
        };
        let transfer = Transfer::from_config(&config);
        let mut executor = MockExecutor::new();
        executor
            .expect_run()
            .withf(move |p, args| p == program && args == expected_args.as_slice())
            .times(1)
            .returning(|_, _| Ok(success_output()));

        transfer
            .mark_uploaded(&executor, Utf8Path::new("/srv/builds/hello"))
            .expect("stamp should succeed");
    }
}
