use crate::run::SpecArgs;
use anyhow::{Context, Result};
use clap::Parser;
use e2e_runner::scripts::collector_script;
use e2e_runner::{build_manifests, random_suffix};

#[derive(Debug, Parser)]
pub(crate) struct Render {
    #[clap(flatten)]
    spec: SpecArgs,
    /// Print only the collector pod's script instead of the manifests.
    #[clap(long)]
    collector: bool,
}

impl Render {
    pub(crate) fn run(self) -> Result<()> {
        let spec = self.spec.to_spec();
        if self.collector {
            let script = collector_script(&spec.name, &spec.output_dir)
                .context("Unable to render the collector script")?;
            println!("{}", script);
            return Ok(());
        }

        let manifests =
            build_manifests(&spec, &random_suffix()).context("Unable to build manifests")?;
        println!(
            "{}",
            serde_yaml::to_string(&manifests.test_cmd).context("Unable to serialize config map")?
        );
        println!("---");
        println!(
            "{}",
            serde_yaml::to_string(&manifests.push_results)
                .context("Unable to serialize config map")?
        );
        println!("---");
        println!(
            "{}",
            serde_yaml::to_string(&manifests.job).context("Unable to serialize job")?
        );
        Ok(())
    }
}
