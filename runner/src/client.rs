use crate::job::{parse_job_state, JobState};
use async_trait::async_trait;
use http::StatusCode;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{ConfigMap, Pod};
use kube::api::{DeleteParams, ListParams, LogParams, PostParams, PropagationPolicy};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Config, ResourceExt};
use log::debug;
use snafu::{ResultExt, Snafu};
use std::fmt::{Debug, Display};
use std::path::Path;

/// The `ClusterClient` is the coordinator's interface to the Kubernetes API. The purpose of the
/// interface is to allow injection of a mock for development and testing of test runs without the
/// presence of a cluster. In practice you will use [`DefaultClusterClient`].
#[async_trait]
pub trait ClusterClient: Sized + Send + Sync {
    /// The error type returned by this trait's functions.
    type E: Debug + Display + Send + Sync + 'static;

    /// Create a config map in the run's namespace.
    async fn create_config_map(&self, config_map: ConfigMap) -> Result<(), Self::E>;

    /// Create a job in the run's namespace.
    async fn create_job(&self, job: Job) -> Result<(), Self::E>;

    /// Get the state of the named job. A job that does not exist is [`JobState::None`].
    async fn job_state(&self, name: &str) -> Result<JobState, Self::E>;

    /// Delete the named job and its pods. Deleting a job that does not exist is not an error.
    async fn delete_job(&self, name: &str) -> Result<(), Self::E>;

    /// Find the name of the pod created for the named job, if one exists.
    async fn find_job_pod(&self, job_name: &str) -> Result<Option<String>, Self::E>;

    /// Fetch the logs of one container of a pod.
    async fn container_logs(&self, pod: &str, container: &str) -> Result<String, Self::E>;
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ClientError {
    #[snafu(display("Config map '{}' already exists: {}", name, source))]
    ConfigMapExists { name: String, source: kube::Error },

    #[snafu(display("Unable to create config map '{}': {}", name, source))]
    CreateConfigMap { name: String, source: kube::Error },

    #[snafu(display("Unable to create job '{}': {}", name, source))]
    CreateJob { name: String, source: kube::Error },

    #[snafu(display("Unable to create Kubernetes client: {}", source))]
    CreateKubeClient { source: kube::Error },

    #[snafu(display("Unable to delete job '{}': {}", name, source))]
    DeleteJob { name: String, source: kube::Error },

    #[snafu(display("Unable to get job '{}': {}", name, source))]
    GetJob { name: String, source: kube::Error },

    #[snafu(display("Job '{}' already exists: {}", name, source))]
    JobExists { name: String, source: kube::Error },

    #[snafu(display("Unable to list pods for job '{}': {}", job_name, source))]
    ListPods {
        job_name: String,
        source: kube::Error,
    },

    #[snafu(display(
        "Unable to get logs of container '{}' in pod '{}': {}",
        container,
        pod,
        source
    ))]
    PodLogs {
        pod: String,
        container: String,
        source: kube::Error,
    },

    #[snafu(display("Unable to read kubeconfig '{}': {}", path.display(), source))]
    ReadKubeconfig {
        path: std::path::PathBuf,
        source: kube::config::KubeconfigError,
    },

    #[snafu(display("Unable to load kubeconfig '{}': {}", path.display(), source))]
    LoadKubeconfig {
        path: std::path::PathBuf,
        source: kube::config::KubeconfigError,
    },
}

/// Check whether a `kube::Error` carries a particular HTTP status code.
fn is_status_code(error: &kube::Error, status_code: StatusCode) -> bool {
    if let kube::Error::Api(response) = error {
        StatusCode::from_u16(response.code)
            .map(|code| code == status_code)
            .unwrap_or_default()
    } else {
        false
    }
}

/// Provides the default [`ClusterClient`] implementation, backed by `kube`. All operations are
/// scoped to the namespace given at construction.
#[derive(Clone)]
pub struct DefaultClusterClient {
    client: kube::Client,
    namespace: String,
}

impl DefaultClusterClient {
    /// Create a client from the default environment (in-cluster config or `KUBECONFIG`).
    pub async fn new<S>(namespace: S) -> ClientResult<Self>
    where
        S: Into<String>,
    {
        let client = kube::Client::try_default()
            .await
            .context(CreateKubeClientSnafu)?;
        Ok(Self {
            client,
            namespace: namespace.into(),
        })
    }

    /// Create a client from a kubeconfig file at `path`.
    pub async fn new_from_kubeconfig_path<S>(path: &Path, namespace: S) -> ClientResult<Self>
    where
        S: Into<String>,
    {
        let kubeconfig = Kubeconfig::read_from(path).context(ReadKubeconfigSnafu { path })?;
        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .context(LoadKubeconfigSnafu { path })?;
        let client = kube::Client::try_from(config).context(CreateKubeClientSnafu)?;
        Ok(Self {
            client,
            namespace: namespace.into(),
        })
    }

    fn api<K>(&self) -> Api<K>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), &self.namespace)
    }
}

#[async_trait]
impl ClusterClient for DefaultClusterClient {
    type E = ClientError;

    async fn create_config_map(&self, config_map: ConfigMap) -> ClientResult<()> {
        let name = config_map.name_any();
        self.api::<ConfigMap>()
            .create(&PostParams::default(), &config_map)
            .await
            .map_err(|e| {
                if is_status_code(&e, StatusCode::CONFLICT) {
                    ClientError::ConfigMapExists {
                        name: name.clone(),
                        source: e,
                    }
                } else {
                    ClientError::CreateConfigMap {
                        name: name.clone(),
                        source: e,
                    }
                }
            })?;
        Ok(())
    }

    async fn create_job(&self, job: Job) -> ClientResult<()> {
        let name = job.name_any();
        self.api::<Job>()
            .create(&PostParams::default(), &job)
            .await
            .map_err(|e| {
                if is_status_code(&e, StatusCode::CONFLICT) {
                    ClientError::JobExists {
                        name: name.clone(),
                        source: e,
                    }
                } else {
                    ClientError::CreateJob {
                        name: name.clone(),
                        source: e,
                    }
                }
            })?;
        Ok(())
    }

    async fn job_state(&self, name: &str) -> ClientResult<JobState> {
        let result = self.api::<Job>().get(name).await;
        match result {
            Ok(job) => Ok(parse_job_state(&job)),
            Err(e) if is_status_code(&e, StatusCode::NOT_FOUND) => Ok(JobState::None),
            Err(e) => Err(ClientError::GetJob {
                name: name.to_owned(),
                source: e,
            }),
        }
    }

    async fn delete_job(&self, name: &str) -> ClientResult<()> {
        let result = self
            .api::<Job>()
            .delete(
                name,
                &DeleteParams {
                    dry_run: false,
                    grace_period_seconds: Some(0),
                    propagation_policy: Some(PropagationPolicy::Foreground),
                    preconditions: None,
                },
            )
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(e) if is_status_code(&e, StatusCode::NOT_FOUND) => {
                debug!("We tried to delete the job '{}' but it did not exist", name);
                Ok(())
            }
            Err(e) => Err(ClientError::DeleteJob {
                name: name.to_owned(),
                source: e,
            }),
        }
    }

    async fn find_job_pod(&self, job_name: &str) -> ClientResult<Option<String>> {
        let pods = self
            .api::<Pod>()
            .list(&ListParams {
                label_selector: Some(format!("job-name={}", job_name)),
                ..Default::default()
            })
            .await
            .context(ListPodsSnafu { job_name })?;
        Ok(pods.items.first().map(|pod| pod.name_any()))
    }

    async fn container_logs(&self, pod: &str, container: &str) -> ClientResult<String> {
        self.api::<Pod>()
            .logs(
                pod,
                &LogParams {
                    container: Some(container.to_owned()),
                    ..Default::default()
                },
            )
            .await
            .context(PodLogsSnafu { pod, container })
    }
}
