//! Maintenance tasks for reltag.
//!
//! - `completions` - shell completion scripts
//! - `man` - man pages for `reltag` and each subcommand
//! - `dist` - both, under `dist/share`
//!
//! Run `cargo xtask --help` to see available commands.

#![deny(unsafe_code)]

mod commands {
    pub mod completions;
    pub mod man;
}

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "xtask")]
#[command(about = "Project maintenance tasks")]
struct Xtask {
    #[command(subcommand)]
    command: Task,
}

#[derive(Subcommand, Debug)]
enum Task {
    /// Generate shell completions for reltag.
    Completions(commands::completions::CompletionsArgs),

    /// Generate man pages for reltag.
    Man(commands::man::ManArgs),

    /// Generate completions and man pages with default locations.
    Dist,
}

fn main() -> Result<(), String> {
    match Xtask::parse().command {
        Task::Completions(args) => commands::completions::cmd_completions(args),
        Task::Man(args) => commands::man::cmd_man(args),
        Task::Dist => {
            commands::completions::cmd_completions(commands::completions::CompletionsArgs::default())?;
            commands::man::cmd_man(commands::man::ManArgs::default())
        }
    }
}

/// Directory containing the workspace `Cargo.toml`.
pub fn workspace_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir.parent().unwrap_or(&manifest_dir).to_path_buf()
}
