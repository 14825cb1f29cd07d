//! Library interface for the `reltag` CLI.
//!
//! Exposes the argument parser and command implementations, mainly so that
//! `xtask` can generate man pages and completions. The entry point is in
//! `main.rs`.
//!
//! - [`Cli`] - The root argument parser (clap derive)
//! - [`Commands`] - Available subcommands
//! - [`commands`] - Command implementations

pub mod commands;

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

/// Color output preference.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Detect terminal capabilities automatically.
    #[default]
    Auto,
    /// Always emit colors.
    Always,
    /// Never emit colors.
    Never,
}

impl ColorChoice {
    /// Set the global color mode. Call once at startup.
    pub fn apply(self) {
        match self {
            Self::Auto => {}
            Self::Always => owo_colors::set_override(true),
            Self::Never => owo_colors::set_override(false),
        }
    }
}

const ENV_HELP: &str = "\
RELEASE RECORD (.release):
    release=1.2.3
    tag=myapp-1.2.3
    pre_tag_command=make VERSION={release}   (optional; also %(release)s)

ENVIRONMENT VARIABLES:
    RUST_LOG            Log filter (e.g., debug, reltag_core=trace)
    RELTAG_LOG_PATH     Explicit log file path
    RELTAG_LOG_DIR      Log directory
";

/// Command-line interface definition for reltag.
#[derive(Parser)]
#[command(name = "reltag")]
#[command(about = "Track, bump, and tag per-directory releases in git", long_about = None)]
#[command(version)]
#[command(after_long_help = ENV_HELP)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Run as if started in DIR
    #[arg(short = 'C', long, global = true, value_name = "DIR")]
    pub chdir: Option<PathBuf>,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// More log detail (repeatable; e.g. -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Colorize output
    #[arg(long, global = true, value_enum, default_value_t)]
    pub color: ColorChoice,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Show the current release, decorated with repository state
    Show(commands::show::ShowArgs),

    /// Show the release a bump would produce
    Next(commands::next::NextArgs),

    /// Bump the release, commit, and tag
    Tag(commands::tag::TagArgs),

    /// Create a release record
    Init(commands::init::InitArgs),
}

/// Returns the clap command for documentation generation
pub fn command() -> clap::Command {
    Cli::command()
}
