use crate::constants::{
    OUTPUT_VOLUME, PUSH_RESULTS, PUSH_RESULTS_FILE, PUSH_RESULTS_MOUNT, PUSH_RESULTS_PREFIX,
    SCRIPT_MODE, TEST_CMD_FILE, TEST_CMD_MOUNT, TEST_CMD_PREFIX, TEST_HARNESS,
};
use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapVolumeSource, Container, EmptyDirVolumeSource, PodSpec, PodTemplateSpec,
    Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use maplit::btreemap;

/// The name of the config map carrying the harness command for the run identified by `suffix`.
pub fn test_cmd_config_map_name(suffix: &str) -> String {
    format!("{}-{}", TEST_CMD_PREFIX, suffix)
}

/// The name of the config map carrying the push script for the run identified by `suffix`.
pub fn push_results_config_map_name(suffix: &str) -> String {
    format!("{}-{}", PUSH_RESULTS_PREFIX, suffix)
}

/// The config map holding the shell command that the `test-harness` container executes.
pub fn test_cmd_config_map(namespace: &str, suffix: &str, command: &str) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(test_cmd_config_map_name(suffix)),
            namespace: Some(namespace.to_owned()),
            ..ObjectMeta::default()
        },
        data: Some(btreemap! {
            TEST_CMD_FILE.to_string() => command.to_string(),
        }),
        ..ConfigMap::default()
    }
}

/// The config map holding the script that the `push-results` container executes.
pub fn push_results_config_map(namespace: &str, suffix: &str, script: &str) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(push_results_config_map_name(suffix)),
            namespace: Some(namespace.to_owned()),
            ..ObjectMeta::default()
        },
        data: Some(btreemap! {
            PUSH_RESULTS_FILE.to_string() => script.to_string(),
        }),
        ..ConfigMap::default()
    }
}

/// Builds the job that runs the test harness. The job's pod carries the `test-harness` and
/// `push-results` containers, both mounting the shared output volume at `output_dir`, each
/// mounting its own script config map. Construction is pure; submission is the coordinator's job.
#[derive(Debug, Clone)]
pub struct JobBuilder<'a> {
    pub namespace: &'a str,
    pub job_name: &'a str,
    pub suffix: &'a str,
    pub image: &'a str,
    pub timeout_seconds: i64,
    pub output_dir: &'a str,
    pub service_account: &'a str,
}

impl JobBuilder<'_> {
    pub fn build(&self) -> Job {
        Job {
            metadata: ObjectMeta {
                name: Some(self.job_name.into()),
                namespace: Some(self.namespace.into()),
                ..ObjectMeta::default()
            },
            spec: Some(JobSpec {
                active_deadline_seconds: Some(self.timeout_seconds),
                backoff_limit: Some(0),
                template: PodTemplateSpec {
                    spec: Some(PodSpec {
                        active_deadline_seconds: Some(self.timeout_seconds),
                        containers: vec![
                            self.container(TEST_HARNESS, TEST_CMD_MOUNT, TEST_CMD_FILE),
                            self.container(PUSH_RESULTS, PUSH_RESULTS_MOUNT, PUSH_RESULTS_FILE),
                        ],
                        restart_policy: Some(String::from("Never")),
                        service_account_name: Some(self.service_account.into()),
                        volumes: Some(self.volumes()),
                        ..PodSpec::default()
                    }),
                    metadata: None,
                },
                ..JobSpec::default()
            }),
            ..Job::default()
        }
    }

    fn container(&self, name: &str, script_mount: &str, script_file: &str) -> Container {
        Container {
            name: name.into(),
            image: Some(self.image.into()),
            command: Some(vec![
                "/bin/sh".to_string(),
                format!("{}/{}", script_mount, script_file),
            ]),
            volume_mounts: Some(vec![
                VolumeMount {
                    name: OUTPUT_VOLUME.into(),
                    mount_path: self.output_dir.into(),
                    ..VolumeMount::default()
                },
                VolumeMount {
                    name: name.into(),
                    mount_path: script_mount.into(),
                    ..VolumeMount::default()
                },
            ]),
            ..Container::default()
        }
    }

    fn volumes(&self) -> Vec<Volume> {
        vec![
            Volume {
                name: OUTPUT_VOLUME.into(),
                empty_dir: Some(EmptyDirVolumeSource::default()),
                ..Volume::default()
            },
            Volume {
                name: TEST_HARNESS.into(),
                config_map: Some(ConfigMapVolumeSource {
                    name: Some(test_cmd_config_map_name(self.suffix)),
                    default_mode: Some(SCRIPT_MODE),
                    ..ConfigMapVolumeSource::default()
                }),
                ..Volume::default()
            },
            Volume {
                name: PUSH_RESULTS.into(),
                config_map: Some(ConfigMapVolumeSource {
                    name: Some(push_results_config_map_name(self.suffix)),
                    default_mode: Some(SCRIPT_MODE),
                    ..ConfigMapVolumeSource::default()
                }),
                ..Volume::default()
            },
        ]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn builder<'a>() -> JobBuilder<'a> {
        JobBuilder {
            namespace: "e2e-project",
            job_name: "openshift-conformance",
            suffix: "ab1cd",
            image: "quay.io/example/tests:latest",
            timeout_seconds: 7200,
            output_dir: "/test-run-results",
            service_account: "cluster-admin",
        }
    }

    #[test]
    fn deadline_matches_timeout() {
        let job = builder().build();
        let spec = job.spec.unwrap();
        assert_eq!(spec.active_deadline_seconds, Some(7200));
        assert_eq!(
            spec.template.spec.as_ref().unwrap().active_deadline_seconds,
            Some(7200)
        );
    }

    #[test]
    fn two_containers_share_the_output_volume() {
        let job = builder().build();
        let pod = job.spec.unwrap().template.spec.unwrap();
        assert_eq!(pod.containers.len(), 2);
        for container in &pod.containers {
            let output_mount = container
                .volume_mounts
                .as_ref()
                .unwrap()
                .iter()
                .find(|m| m.name == OUTPUT_VOLUME)
                .expect("container is missing the output volume mount");
            assert_eq!(output_mount.mount_path, "/test-run-results");
        }
    }

    #[test]
    fn containers_run_their_scripts() {
        let job = builder().build();
        let pod = job.spec.unwrap().template.spec.unwrap();
        let commands: Vec<_> = pod
            .containers
            .iter()
            .map(|c| c.command.clone().unwrap())
            .collect();
        assert!(commands.contains(&vec![
            "/bin/sh".to_string(),
            "/test-cmd/test-cmd.sh".to_string()
        ]));
        assert!(commands.contains(&vec![
            "/bin/sh".to_string(),
            "/push-results/push-results.sh".to_string()
        ]));
    }

    #[test]
    fn script_volumes_are_executable_config_maps() {
        let job = builder().build();
        let pod = job.spec.unwrap().template.spec.unwrap();
        let volumes = pod.volumes.unwrap();
        let names: Vec<_> = volumes
            .iter()
            .filter_map(|v| v.config_map.as_ref())
            .map(|cm| (cm.name.clone().unwrap(), cm.default_mode.unwrap()))
            .collect();
        assert!(names.contains(&("test-cmd-ab1cd".to_string(), 0o755)));
        assert!(names.contains(&("push-results-ab1cd".to_string(), 0o755)));
    }

    #[test]
    fn pod_never_restarts() {
        let job = builder().build();
        let spec = job.spec.unwrap();
        assert_eq!(spec.backoff_limit, Some(0));
        let pod = spec.template.spec.unwrap();
        assert_eq!(pod.restart_policy.as_deref(), Some("Never"));
        assert_eq!(pod.service_account_name.as_deref(), Some("cluster-admin"));
    }

    #[test]
    fn config_map_names_derive_from_suffix() {
        let cm = test_cmd_config_map("e2e-project", "zz9xy", "touch results.xml");
        assert_eq!(cm.metadata.name.as_deref(), Some("test-cmd-zz9xy"));
        assert_eq!(
            cm.data.unwrap().get("test-cmd.sh").map(String::as_str),
            Some("touch results.xml")
        );

        let cm = push_results_config_map("e2e-project", "zz9xy", "echo push");
        assert_eq!(cm.metadata.name.as_deref(), Some("push-results-zz9xy"));
        assert_eq!(
            cm.data.unwrap().get("push-results.sh").map(String::as_str),
            Some("echo push")
        );
    }
}
