//! reltag CLI
#![deny(unsafe_code)]

use std::process::ExitCode;

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::Parser;
use owo_colors::{OwoColorize, Stream};
use reltag::{Cli, Commands, commands};
use reltag_core::batch::Report;
use reltag_core::config::ConfigLoader;
use tracing::debug;

mod observability;

fn utf8(path: std::path::PathBuf, what: &str) -> anyhow::Result<Utf8PathBuf> {
    Utf8PathBuf::try_from(path)
        .map_err(|e| anyhow::anyhow!("{what} is not valid UTF-8: {}", e.into_path_buf().display()))
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    cli.color.apply();

    if let Some(ref dir) = cli.chdir {
        std::env::set_current_dir(dir)
            .with_context(|| format!("failed to change directory to {}", dir.display()))?;
    }

    let cwd = std::env::current_dir().context("failed to determine current directory")?;
    let cwd = utf8(cwd, "current directory")?;

    let mut loader = ConfigLoader::new().with_project_search(&cwd);
    if let Some(ref path) = cli.config {
        loader = loader.with_file(utf8(path.clone(), "config path")?);
    }
    let config = loader.load().context("failed to load configuration")?;

    let settings = observability::LogSettings {
        config_dir: config.log_dir.as_ref().map(|d| d.as_std_path().to_path_buf()),
    };
    let filter = observability::env_filter(cli.quiet, cli.verbose, config.log_level.as_str());
    let _guard = observability::init(&settings, filter).context("failed to initialize logging")?;

    debug!(
        verbose = cli.verbose,
        quiet = cli.quiet,
        json = cli.json,
        cwd = %cwd,
        file_name = %config.release.file_name,
        "CLI initialized"
    );

    let mut report = Report::new();
    let result = match cli.command {
        Commands::Show(args) => commands::show::cmd_show(args, cli.json, &config, &mut report),
        Commands::Next(args) => commands::next::cmd_next(args, cli.json, &config, &mut report),
        Commands::Tag(args) => commands::tag::cmd_tag(args, cli.json, &config, &mut report),
        Commands::Init(args) => commands::init::cmd_init(args, cli.json, &config, &mut report),
    };

    match result {
        // JSON output already carries every message; stderr still gets the errors.
        Ok(()) => commands::print_messages(&report, cli.quiet || cli.json),
        Err(err) => {
            tracing::error!(error = %err, "fatal error");
            commands::print_messages(&report, cli.quiet || cli.json);
            eprintln!(
                "{} {err}",
                "ERROR:".if_supports_color(Stream::Stderr, |t| t.red())
            );
            return Ok(ExitCode::FAILURE);
        }
    }

    Ok(if report.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
