/*!

This library coordinates one run of a containerized test suite inside a live
OpenShift/Kubernetes cluster. A run submits a batch `Job` with two containers:
a `test-harness` container that executes the suite and writes JUnit XML files
to a shared output volume, and a `push-results` sidecar that waits for the
harness to finish and syncs the output directory off-cluster. Both containers
receive their commands through config-map-mounted shell scripts.

The pieces are:
- [`job`]: builds the job and config map manifests.
- [`scripts`]: generates the shell scripts delivered through the config maps.
- [`TestRun`]: drives the lifecycle (submit, poll, collect logs).
- [`results`]: retrieves the XML/log artifacts after a run.

Kubernetes access goes through the [`ClusterClient`] trait so that a run can
be tested without a cluster. In practice you will use [`DefaultClusterClient`].
See `tests/mock.rs` for an example of mocking the client.

!*/

mod client;
pub mod constants;
pub mod error;
pub mod job;
pub mod results;
mod run;
pub mod scripts;
pub mod wait;

pub use client::{ClientError, ClusterClient, DefaultClusterClient};
pub use job::JobState;
pub use results::ResultSet;
pub use run::{build_manifests, random_suffix, RunManifests, RunOutcome, RunState, TestRun, TestRunSpec};
