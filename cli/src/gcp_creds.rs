use anyhow::{Context, Result};
use clap::Parser;
use e2e_config::GcpCredentials;

#[derive(Debug, Parser)]
pub(crate) struct GcpCreds {}

impl GcpCreds {
    pub(crate) fn run(self) -> Result<()> {
        let creds = GcpCredentials::from_env()
            .context("Unable to bind GCP credentials from the environment")?;
        println!(
            "{}",
            creds
                .to_json()
                .context("Unable to serialize GCP credentials")?
        );
        Ok(())
    }
}
