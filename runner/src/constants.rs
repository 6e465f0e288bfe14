use std::time::Duration;

// Container names
pub const TEST_HARNESS: &str = "test-harness";
pub const PUSH_RESULTS: &str = "push-results";

// Script config map name prefixes. The full name is `<prefix>-<suffix>` where
// the suffix is unique per run.
pub const TEST_CMD_PREFIX: &str = "test-cmd";
pub const PUSH_RESULTS_PREFIX: &str = "push-results";

// Script file names and mount paths inside the job pod
pub const TEST_CMD_FILE: &str = "test-cmd.sh";
pub const PUSH_RESULTS_FILE: &str = "push-results.sh";
pub const TEST_CMD_MOUNT: &str = "/test-cmd";
pub const PUSH_RESULTS_MOUNT: &str = "/push-results";

// The shared empty-dir volume that both containers mount at the output
// directory.
pub const OUTPUT_VOLUME: &str = "test-output";
pub const DEFAULT_OUTPUT_DIR: &str = "/test-run-results";

// Scripts are delivered with executable mode.
pub const SCRIPT_MODE: i32 = 0o755;

// Subdirectory of the output directory where container logs are written.
pub const CONTAINER_LOGS_DIR: &str = "containerLogs";

// Length of the random per-run suffix used to derive resource names.
pub const SUFFIX_LEN: usize = 5;

// How often the coordinator checks the job's status.
pub const JOB_POLL_INTERVAL: Duration = Duration::from_secs(1);
