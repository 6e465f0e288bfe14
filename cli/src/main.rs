/*!

This is the command line interface for running containerized test suites in a
cluster and cleaning up the cloud resources test runs leave behind.

!*/

mod cleanup_buckets;
mod gcp_creds;
mod render;
mod run;

use anyhow::Result;
use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;
use std::path::PathBuf;

/// The command line interface for running cluster test suites and sweeping up after them.
#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Args {
    /// Set logging verbosity [trace|debug|info|warn|error]. If the environment variable `RUST_LOG`
    /// is present, it overrides the default logging behavior. See https://docs.rs/env_logger/latest
    #[clap(long = "log-level", default_value = "info")]
    log_level: LevelFilter,
    /// Path to the kubeconfig file. Also can be passed with the KUBECONFIG environment variable.
    #[clap(long = "kubeconfig")]
    kubeconfig: Option<PathBuf>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Parser)]
enum Command {
    /// Run a test suite as a job in the cluster and retrieve its results.
    Run(run::Run),
    /// Print the manifests and scripts a run would submit, without touching a cluster.
    Render(render::Render),
    /// Delete stale S3 buckets left behind by old runs.
    CleanupBuckets(cleanup_buckets::CleanupBuckets),
    /// Print the GCP credentials document assembled from the environment.
    GcpCreds(gcp_creds::GcpCreds),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logger(args.log_level);
    if let Err(e) = run(args).await {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    match args.command {
        Command::Run(run) => run.run(args.kubeconfig).await,
        Command::Render(render) => render.run(),
        Command::CleanupBuckets(cleanup) => cleanup.run().await,
        Command::GcpCreds(gcp_creds) => gcp_creds.run(),
    }
}

/// Initialize the logger with the value passed by `--log-level` (or its default) when the
/// `RUST_LOG` environment variable is not present. If present, the `RUST_LOG` environment variable
/// overrides `--log-level`/`level`.
fn init_logger(level: LevelFilter) {
    match std::env::var(env_logger::DEFAULT_FILTER_ENV).ok() {
        Some(_) => {
            // RUST_LOG exists; env_logger will use it.
            Builder::from_default_env().init();
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            Builder::new()
                .filter(Some(env!("CARGO_CRATE_NAME")), level)
                .init();
        }
    }
}
