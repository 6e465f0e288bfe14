use anyhow::{Context, Result};
use clap::Parser;
use e2e_runner::constants::DEFAULT_OUTPUT_DIR;
use e2e_runner::{DefaultClusterClient, TestRun, TestRunSpec};
use log::info;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Arguments describing one test run. Shared by `run` and `render`.
#[derive(Debug, Parser)]
pub(crate) struct SpecArgs {
    /// Name of the job. Pods are selected with the `job-name=<name>` label.
    #[clap(long, default_value = "openshift-conformance")]
    pub(crate) name: String,
    /// Namespace to create the run's resources in.
    #[clap(long)]
    pub(crate) namespace: String,
    /// Container image for both the test harness and the result pusher.
    #[clap(long)]
    pub(crate) image: String,
    /// Seconds before the job (and the wait for it) is considered failed.
    #[clap(long, default_value_t = 7200)]
    pub(crate) timeout: i64,
    /// Directory the harness writes results to.
    #[clap(long, default_value = DEFAULT_OUTPUT_DIR)]
    pub(crate) output_dir: String,
    /// Service account the job's pod runs as.
    #[clap(long, default_value = "cluster-admin")]
    pub(crate) service_account: String,
    /// Shell command the test harness container executes.
    #[clap(long)]
    pub(crate) command: String,
}

impl SpecArgs {
    pub(crate) fn to_spec(&self) -> TestRunSpec {
        TestRunSpec {
            name: self.name.clone(),
            namespace: self.namespace.clone(),
            image: self.image.clone(),
            timeout_seconds: self.timeout,
            output_dir: self.output_dir.clone(),
            service_account: self.service_account.clone(),
            command: self.command.clone(),
        }
    }
}

#[derive(Debug, Parser)]
pub(crate) struct Run {
    #[clap(flatten)]
    spec: SpecArgs,
}

impl Run {
    pub(crate) async fn run(self, kubeconfig: Option<PathBuf>) -> Result<()> {
        let namespace = self.spec.namespace.clone();
        let client = match kubeconfig {
            Some(path) => DefaultClusterClient::new_from_kubeconfig_path(&path, namespace)
                .await
                .with_context(|| {
                    format!("Unable to create cluster client from path '{:?}'", path)
                })?,
            None => DefaultClusterClient::new(namespace)
                .await
                .context("Unable to create default cluster client")?,
        };

        let mut test_run = TestRun::new(client, self.spec.to_spec());

        // Ctrl-C cancels the wait and makes a best-effort deletion of the remote job.
        let cancel = CancellationToken::new();
        let signal_token = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                signal_token.cancel();
            }
        });

        test_run
            .run(cancel)
            .await
            .context("The test run did not finish")?;

        let results = test_run
            .retrieve_results()
            .context("Error reading XML results, the suite may have exited abruptly")?;
        info!(
            "Run finished with {} result file(s) and {} log file(s)",
            results.xml.len(),
            results.logs.len()
        );
        for name in results.xml.keys() {
            println!("{}", name);
        }
        Ok(())
    }
}
