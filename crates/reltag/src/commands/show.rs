//! Show command: print the current release of each directory.

use clap::Args;
use tracing::{debug, instrument};

use reltag_core::batch::{self, Report};
use reltag_core::config::Config;
use reltag_core::workflow;

use super::TargetArgs;

/// Arguments for the `show` subcommand.
#[derive(Args, Debug, Default)]
pub struct ShowArgs {
    /// Record directories to operate on
    #[command(flatten)]
    pub targets: TargetArgs,
}

/// Print `release[-rev[-dirty]][@branch]` per directory.
#[instrument(name = "cmd_show", skip_all, fields(recursive = args.targets.recursive))]
pub fn cmd_show(
    args: ShowArgs,
    json: bool,
    config: &Config,
    report: &mut Report,
) -> anyhow::Result<()> {
    let directories = args.targets.resolve(&config.release.file_name, report);
    debug!(count = directories.len(), "showing releases");

    let shown = batch::for_each_directory(&directories, report, |dir, _| {
        workflow::show_current(dir, &config.release)
    })?;

    if json {
        return super::print_json(&shown, report);
    }
    for item in &shown {
        println!(
            "{}",
            super::line(args.targets.recursive, &item.directory, &item.current)
        );
    }
    Ok(())
}
