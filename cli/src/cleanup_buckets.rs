use anyhow::{Context, Result};
use chrono::Duration;
use clap::Parser;
use e2e_aws::{cleanup_buckets, AwsSession, SessionSettings};

#[derive(Debug, Parser)]
pub(crate) struct CleanupBuckets {
    /// Only delete buckets older than this many hours.
    #[clap(long, default_value_t = 24)]
    older_than_hours: i64,
    /// Report what would be deleted without deleting anything.
    #[clap(long)]
    dry_run: bool,
    /// The AWS region to operate in.
    #[clap(long)]
    region: Option<String>,
    /// The shared-config profile to take credentials from.
    #[clap(long)]
    profile: Option<String>,
}

impl CleanupBuckets {
    pub(crate) async fn run(self) -> Result<()> {
        let session = AwsSession::shared(&SessionSettings {
            region: self.region,
            profile: self.profile,
            account_id: None,
        })
        .await;
        cleanup_buckets(session, Duration::hours(self.older_than_hours), self.dry_run)
            .await
            .context("The bucket sweep failed")
    }
}
