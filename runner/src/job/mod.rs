mod job_builder;

pub use job_builder::{
    push_results_config_map, push_results_config_map_name, test_cmd_config_map,
    test_cmd_config_map_name, JobBuilder,
};
use k8s_openapi::api::batch::v1::Job;

/// We run the test harness using a k8s `Job`. Jobs provide counts of how many pods are running or
/// have completed (succeeded or failed). We are running a single pod with no retries, so it is
/// helpful to transform those counts into a simple enumeration of our job's state.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum JobState {
    /// The job does not exist.
    None,
    /// The job exists but we cannot figure out the status of its pod. Hopefully this is transient
    /// and you can check the job again later.
    Unknown,
    /// The job is running.
    Running,
    /// The job is no longer running and its pod failed (or the job's deadline elapsed).
    Failed,
    /// The job is no longer running, and its pod exited with `0`. We avoid calling this 'success'
    /// because the harness may have exited without producing results.
    Exited,
}

impl JobState {
    /// A terminal state is one from which no further transition occurs.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Failed | JobState::Exited)
    }
}

/// Transform the pod counts in `job.status` to a `JobState`.
pub fn parse_job_state(job: &Job) -> JobState {
    let status = match &job.status {
        None => return JobState::Unknown,
        Some(some) => some,
    };

    // Unwrap the pod counts defaulting to zero if they are missing.
    let running = status.active.unwrap_or(0);
    let succeeded = status.succeeded.unwrap_or(0);
    let failed = status.failed.unwrap_or(0);

    // No pods counted probably means the pod hasn't started yet.
    if running + succeeded + failed == 0 {
        return JobState::Unknown;
    }

    if running > 0 {
        JobState::Running
    } else if failed > 0 {
        // With `backoff_limit: 0` a failed pod is terminal, so a failure count trumps anything
        // else that might be recorded.
        JobState::Failed
    } else {
        JobState::Exited
    }
}
