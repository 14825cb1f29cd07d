//! Tag command: bump, commit, and tag each directory.

use clap::Args;
use tracing::{debug, instrument};

use reltag_core::BumpLevel;
use reltag_core::batch::{self, Report};
use reltag_core::config::Config;
use reltag_core::workflow;

use super::TargetArgs;

/// Arguments for the `tag` subcommand.
#[derive(Args, Debug, Default)]
pub struct TagArgs {
    /// Release component to bump
    #[arg(short, long, value_enum, default_value_t)]
    pub level: BumpLevel,

    /// Show what would happen without saving, committing, or tagging
    #[arg(long)]
    pub dry_run: bool,

    /// Tag the recorded release as-is instead of bumping
    #[arg(long, conflicts_with = "level")]
    pub current: bool,

    /// Record directories to operate on
    #[command(flatten)]
    pub targets: TargetArgs,
}

/// Outcomes go to the report; `--json` also prints them.
#[instrument(name = "cmd_tag", skip_all, fields(level = %args.level, dry_run = args.dry_run, current = args.current))]
pub fn cmd_tag(
    args: TagArgs,
    json: bool,
    config: &Config,
    report: &mut Report,
) -> anyhow::Result<()> {
    let directories = args.targets.resolve(&config.release.file_name, report);
    debug!(count = directories.len(), "tagging");

    let outcomes = batch::for_each_directory(&directories, report, |dir, report| {
        if args.current {
            workflow::tag_current(dir, &config.release, args.dry_run, report)
        } else {
            workflow::tag_next(dir, &config.release, args.level, args.dry_run, report)
        }
    })?;

    if json {
        super::print_json(&outcomes, report)?;
    }
    Ok(())
}
