use crate::scripts::ScriptError;
use snafu::Snafu;
use std::fmt::{Debug, Display, Formatter};
use std::time::Duration;

/// The `Error` type for a [`TestRun`]. Errors originating from the
/// [`ClusterClient`] are passed through, preserving their type. Errors
/// originating with the coordinator itself are of the [`RunError`] type.
///
/// [`TestRun`]: crate::TestRun
/// [`ClusterClient`]: crate::ClusterClient
#[derive(Debug)]
pub enum Error<C>
where
    C: Debug + Display + Send + Sync + 'static,
{
    /// An error originating from the [`ClusterClient`](crate::ClusterClient).
    Client(C),
    /// An error originating from the coordinator.
    Run(RunError),
}

/// The `Result` type for a [`TestRun`](crate::TestRun).
pub type Result<T, C> = std::result::Result<T, Error<C>>;

impl<C> std::error::Error for Error<C> where C: Debug + Display + Send + Sync + 'static {}

impl<C> Display for Error<C>
where
    C: Debug + Display + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Client(e) => write!(f, "cluster client error: {}", e),
            Error::Run(e) => write!(f, "run error: {}", e),
        }
    }
}

/// An error that has originated with the coordinator.
#[derive(Debug, Snafu)]
pub struct RunError(InnerError);

/// The private error type, [`RunError`] is opaque. `InnerError` is the underlying error type.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub(crate) enum InnerError {
    #[snafu(display("The run of job '{}' was canceled", job_name))]
    Canceled { job_name: String },

    #[snafu(display("Timeout must be a positive number of seconds, got {}", timeout))]
    InvalidTimeout { timeout: i64 },

    #[snafu(display("Job '{}' finished with a failed container", job_name))]
    JobFailed { job_name: String },

    #[snafu(display("Job '{}' disappeared from the cluster before finishing", job_name))]
    JobRemoved { job_name: String },

    #[snafu(display("Unable to render the '{}' script: {}", script, source))]
    RenderScript {
        script: String,
        source: ScriptError,
    },

    #[snafu(display(
        "Job '{}' did not reach a terminal state within {:?}",
        job_name,
        duration
    ))]
    WaitTimeout {
        job_name: String,
        duration: Duration,
    },
}

impl<C> From<InnerError> for Error<C>
where
    C: Debug + Display + Send + Sync + 'static,
{
    fn from(e: InnerError) -> Self {
        Error::Run(e.into())
    }
}
