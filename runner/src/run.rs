use crate::client::ClusterClient;
use crate::constants::{
    CONTAINER_LOGS_DIR, JOB_POLL_INTERVAL, PUSH_RESULTS, SUFFIX_LEN, TEST_HARNESS,
};
use crate::error::{self, Error, Result, RunError};
use crate::job::{
    push_results_config_map, test_cmd_config_map, JobBuilder, JobState,
};
use crate::results::{self, ResultSet, ResultsError};
use crate::scripts;
use crate::wait::{wait_until, WaitError};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::ConfigMap;
use log::{error, info, warn};
use rand::Rng;
use snafu::{ensure, ResultExt};
use std::cell::Cell;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Describes one invocation of a test harness inside the cluster.
#[derive(Debug, Clone)]
pub struct TestRunSpec {
    /// The job name, also used as the pod label selector (`job-name=<name>`).
    pub name: String,
    pub namespace: String,
    /// The container image used for both the harness and the pusher.
    pub image: String,
    /// The job's `activeDeadlineSeconds`. Must be positive.
    pub timeout_seconds: i64,
    /// The directory that both containers mount and that the harness writes results to.
    pub output_dir: String,
    pub service_account: String,
    /// The shell command the harness container executes.
    pub command: String,
}

/// The terminal outcome of a run.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RunOutcome {
    Succeeded,
    Failed,
    TimedOut,
}

/// Where a run is in its lifecycle.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RunState {
    /// The run exists but nothing has been sent to the cluster.
    Created,
    /// The config maps and job have been created in the cluster.
    Submitted,
    /// We are polling the job's status.
    Polling,
    /// The job reached a terminal state.
    Terminal(RunOutcome),
}

/// The manifests a run submits, in the order they must be created: config maps strictly before
/// the job that references them.
#[derive(Debug, Clone)]
pub struct RunManifests {
    pub test_cmd: ConfigMap,
    pub push_results: ConfigMap,
    pub job: Job,
}

/// Coordinates one run of the test harness: creates the script config maps and the job, polls the
/// job until it reaches a terminal state, and makes a best-effort copy of the harness pod's
/// container logs into the output directory.
///
/// The `TestRun` manages exactly one job and is not internally parallel. Runs may execute
/// concurrently with each other; each generates a unique suffix so that derived resource names do
/// not collide.
pub struct TestRun<C>
where
    C: ClusterClient,
{
    client: C,
    spec: TestRunSpec,
    suffix: String,
    state: RunState,
}

impl<C> TestRun<C>
where
    C: ClusterClient,
{
    pub fn new(client: C, spec: TestRunSpec) -> Self {
        Self {
            client,
            spec,
            suffix: random_suffix(),
            state: RunState::Created,
        }
    }

    /// The unique per-run suffix that resource names are derived from.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Build the manifests this run will submit, without touching the cluster.
    pub fn manifests(&self) -> std::result::Result<RunManifests, RunError> {
        build_manifests(&self.spec, &self.suffix)
    }

    /// Run to completion. Submits the config maps and the job, then polls the job's state every
    /// second until it is terminal, bounded by the spec's timeout. A timeout is a failure and is
    /// returned as an error. Triggering `cancel` interrupts the wait and makes a best-effort
    /// deletion of the remote job so that cluster resources are not orphaned.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<(), C::E> {
        let manifests = self.manifests().map_err(Error::Run)?;

        // The job references the config maps, so they must exist first.
        self.client
            .create_config_map(manifests.test_cmd)
            .await
            .map_err(Error::Client)?;
        self.client
            .create_config_map(manifests.push_results)
            .await
            .map_err(Error::Client)?;
        self.client
            .create_job(manifests.job)
            .await
            .map_err(Error::Client)?;
        self.state = RunState::Submitted;
        info!(
            "Created job '{}' in namespace '{}' (suffix '{}')",
            self.spec.name, self.spec.namespace, self.suffix
        );

        self.state = RunState::Polling;
        let timeout = Duration::from_secs(self.spec.timeout_seconds as u64);
        let last_state = Cell::new(JobState::Unknown);
        let client = &self.client;
        let job_name = self.spec.name.as_str();
        let observed = &last_state;
        let wait_result = wait_until(JOB_POLL_INTERVAL, timeout, &cancel, move || async move {
            let state = client.job_state(job_name).await?;
            observed.set(state);
            Ok(state.is_terminal() || state == JobState::None)
        })
        .await;

        match wait_result {
            Ok(()) => {}
            Err(WaitError::Canceled) => {
                info!(
                    "Run of job '{}' was canceled, deleting the job",
                    self.spec.name
                );
                if let Err(e) = self.client.delete_job(&self.spec.name).await {
                    error!(
                        "Unable to delete job '{}' after cancellation: {}",
                        self.spec.name, e
                    );
                }
                self.state = RunState::Terminal(RunOutcome::Failed);
                return Err(error::CanceledSnafu {
                    job_name: &self.spec.name,
                }
                .build()
                .into());
            }
            Err(WaitError::TimedOut { duration }) => {
                self.state = RunState::Terminal(RunOutcome::TimedOut);
                return Err(error::WaitTimeoutSnafu {
                    job_name: &self.spec.name,
                    duration,
                }
                .build()
                .into());
            }
            Err(WaitError::Predicate(e)) => return Err(Error::Client(e)),
        }

        match last_state.get() {
            JobState::Exited => {
                self.collect_container_logs().await;
                self.state = RunState::Terminal(RunOutcome::Succeeded);
                info!("Job '{}' finished", self.spec.name);
                Ok(())
            }
            JobState::Failed => {
                // Collect what we can; retrieval may still find partial results.
                self.collect_container_logs().await;
                self.state = RunState::Terminal(RunOutcome::Failed);
                Err(error::JobFailedSnafu {
                    job_name: &self.spec.name,
                }
                .build()
                .into())
            }
            _ => {
                self.state = RunState::Terminal(RunOutcome::Failed);
                Err(error::JobRemovedSnafu {
                    job_name: &self.spec.name,
                }
                .build()
                .into())
            }
        }
    }

    /// Scan the output directory for the artifacts the run produced. Fails when no XML result
    /// file is found, even if the job exited zero, so that a harness that silently produced no
    /// output does not show up green.
    pub fn retrieve_results(&self) -> std::result::Result<ResultSet, ResultsError> {
        results::retrieve(&self.spec.output_dir)
    }

    /// Copy both containers' logs into `<output_dir>/containerLogs`. This is best-effort: the pod
    /// may have been evicted or garbage collected, and missing logs should not fail a run that
    /// otherwise finished.
    async fn collect_container_logs(&self) {
        let pod = match self.client.find_job_pod(&self.spec.name).await {
            Ok(Some(pod)) => pod,
            Ok(None) => {
                info!(
                    "test harness pod for job '{}' not found, it may have been terminated",
                    self.spec.name
                );
                return;
            }
            Err(e) => {
                warn!(
                    "Unable to look up the pod for job '{}': {}",
                    self.spec.name, e
                );
                return;
            }
        };
        info!("found test harness pod '{}'", pod);
        let logs_dir = Path::new(&self.spec.output_dir).join(CONTAINER_LOGS_DIR);
        if let Err(e) = tokio::fs::create_dir_all(&logs_dir).await {
            warn!(
                "Unable to create log directory '{}': {}",
                logs_dir.display(),
                e
            );
            return;
        }
        for container in [TEST_HARNESS, PUSH_RESULTS] {
            match self.client.container_logs(&pod, container).await {
                Ok(logs) => {
                    let path = logs_dir.join(format!("{}-{}.log", pod, container));
                    if let Err(e) = tokio::fs::write(&path, logs).await {
                        warn!("Unable to write log file '{}': {}", path.display(), e);
                    }
                }
                Err(e) => {
                    warn!(
                        "Unable to get logs of container '{}' in pod '{}': {}",
                        container, pod, e
                    );
                }
            }
        }
    }
}

/// Build the manifests a run with the given spec and suffix would submit, without touching the
/// cluster.
pub fn build_manifests(
    spec: &TestRunSpec,
    suffix: &str,
) -> std::result::Result<RunManifests, RunError> {
    ensure!(
        spec.timeout_seconds > 0,
        error::InvalidTimeoutSnafu {
            timeout: spec.timeout_seconds
        }
    );
    let push = scripts::push_script(&spec.name, &spec.output_dir).context(
        error::RenderScriptSnafu {
            script: PUSH_RESULTS,
        },
    )?;
    Ok(RunManifests {
        test_cmd: test_cmd_config_map(&spec.namespace, suffix, &spec.command),
        push_results: push_results_config_map(&spec.namespace, suffix, &push),
        job: JobBuilder {
            namespace: &spec.namespace,
            job_name: &spec.name,
            suffix,
            image: &spec.image,
            timeout_seconds: spec.timeout_seconds,
            output_dir: &spec.output_dir,
            service_account: &spec.service_account,
        }
        .build(),
    })
}

/// Generates the unique per-run identifier from which the config map names are derived.
pub fn random_suffix() -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..SUFFIX_LEN)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}
