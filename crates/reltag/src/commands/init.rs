//! Init command: create release records.

use clap::Args;
use tracing::instrument;

use reltag_core::batch::{self, Report};
use reltag_core::config::Config;
use reltag_core::workflow;

use super::TargetArgs;

/// Arguments for the `init` subcommand.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Starting release, as major.minor.patch
    #[arg(value_name = "RELEASE", value_parser = parse_release)]
    pub release: String,

    /// Directories to create records in
    #[command(flatten)]
    pub targets: TargetArgs,
}

fn parse_release(text: &str) -> Result<String, String> {
    reltag_core::VersionVector::parse(text)
        .map(|v| v.to_string())
        .map_err(|e| e.to_string())
}

/// Create a record in each directory that lacks one.
#[instrument(name = "cmd_init", skip_all, fields(release = %args.release))]
pub fn cmd_init(
    args: InitArgs,
    json: bool,
    config: &Config,
    report: &mut Report,
) -> anyhow::Result<()> {
    if args.targets.recursive {
        anyhow::bail!("init cannot be used with --recursive");
    }

    let created = batch::for_each_directory(&args.targets.roots(), report, |dir, report| {
        workflow::initialize(dir, &args.release, &config.release, report)
    })?;

    if json {
        super::print_json(&created, report)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_argument_is_validated() {
        assert_eq!(parse_release("0.1.0").as_deref(), Ok("0.1.0"));
        assert!(parse_release("0.1").is_err());
    }
}
