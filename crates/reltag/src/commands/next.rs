//! Next command: print the release a bump would produce.

use clap::Args;
use tracing::instrument;

use reltag_core::BumpLevel;
use reltag_core::batch::{self, Report};
use reltag_core::config::Config;
use reltag_core::workflow;

use super::TargetArgs;

/// Arguments for the `next` subcommand.
#[derive(Args, Debug, Default)]
pub struct NextArgs {
    /// Release component to bump
    #[arg(short, long, value_enum, default_value_t)]
    pub level: BumpLevel,

    /// Record directories to operate on
    #[command(flatten)]
    pub targets: TargetArgs,
}

/// Print the bumped release per directory.
#[instrument(name = "cmd_next", skip_all, fields(level = %args.level))]
pub fn cmd_next(
    args: NextArgs,
    json: bool,
    config: &Config,
    report: &mut Report,
) -> anyhow::Result<()> {
    let directories = args.targets.resolve(&config.release.file_name, report);
    let next = batch::for_each_directory(&directories, report, |dir, _| {
        workflow::show_next(dir, &config.release, args.level)
    })?;

    if json {
        return super::print_json(&next, report);
    }
    for item in &next {
        println!(
            "{}",
            super::line(args.targets.recursive, &item.directory, item.release)
        );
    }
    Ok(())
}
