//! Command implementations

pub mod init;

pub mod next;

pub mod show;

pub mod tag;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;
use tracing::debug;

use reltag_core::batch::{Message, Report, Severity};
use reltag_core::discover;

/// Directory selection shared by every subcommand.
#[derive(Args, Debug, Default)]
pub struct TargetArgs {
    /// Directories to process (default: the current directory)
    #[arg(value_name = "DIRECTORY")]
    pub directories: Vec<Utf8PathBuf>,

    /// Process every directory below DIRECTORY that has a release record
    #[arg(short, long)]
    pub recursive: bool,
}

impl TargetArgs {
    /// Directories given on the command line, or `.`.
    pub fn roots(&self) -> Vec<Utf8PathBuf> {
        if self.directories.is_empty() {
            vec![Utf8PathBuf::from(".")]
        } else {
            self.directories.clone()
        }
    }

    /// Directories to process. In recursive mode, roots that cannot be
    /// searched are reported and skipped.
    pub fn resolve(&self, file_name: &str, report: &mut Report) -> Vec<Utf8PathBuf> {
        let roots = self.roots();
        if !self.recursive {
            return roots;
        }

        let mut found = Vec::new();
        for root in &roots {
            match discover::find_release_dirs(root, file_name) {
                Ok(dirs) => found.extend(dirs),
                Err(err) => report.error(root, err.to_string()),
            }
        }
        debug!(count = found.len(), "recursive targets");
        found
    }
}

#[derive(Serialize)]
struct JsonOutput<'a, T> {
    results: &'a [T],
    messages: &'a [Message],
}

/// Print `results` and the report as one JSON document on stdout.
pub fn print_json<T: Serialize>(results: &[T], report: &Report) -> anyhow::Result<()> {
    let output = JsonOutput {
        results,
        messages: report.messages(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Write report messages to stderr with colored prefixes. `quiet` drops
/// the informational ones.
pub fn print_messages(report: &Report, quiet: bool) {
    if quiet {
        report.errors().for_each(print_message);
    } else {
        report.messages().iter().for_each(print_message);
    }
}

fn print_message(message: &Message) {
    match message.severity {
        Severity::Info => eprintln!(
            "{} {}",
            "INFO:".if_supports_color(Stream::Stderr, |t| t.cyan()),
            message.text
        ),
        Severity::Error => eprintln!(
            "{} {}",
            "ERROR:".if_supports_color(Stream::Stderr, |t| t.red()),
            message.text
        ),
    }
}

/// A line of tab-separated output for recursive mode.
pub fn line(recursive: bool, directory: &Utf8Path, value: impl std::fmt::Display) -> String {
    if recursive {
        format!("{directory}\t{value}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn roots_default_to_current_directory() {
        assert_eq!(TargetArgs::default().roots(), vec![Utf8PathBuf::from(".")]);
    }

    #[test]
    fn non_recursive_keeps_directories_verbatim() {
        let args = TargetArgs {
            directories: vec!["a".into(), "b".into()],
            recursive: false,
        };
        let mut report = Report::new();
        assert_eq!(args.resolve(".release", &mut report), args.directories);
        assert!(report.messages().is_empty());
    }

    #[test]
    fn recursive_expands_and_reports_bad_roots() {
        let tmp = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        fs::create_dir_all(root.join("svc")).unwrap();
        fs::write(root.join("svc/.release"), "release=1.0.0\ntag=svc-1.0.0\n").unwrap();

        let args = TargetArgs {
            directories: vec![root.clone(), root.join("missing")],
            recursive: true,
        };
        let mut report = Report::new();
        let dirs = args.resolve(".release", &mut report);

        assert_eq!(dirs, vec![root.join("svc")]);
        assert!(report.has_errors());
    }

    #[test]
    fn line_format() {
        assert_eq!(line(false, Utf8Path::new("svc"), "1.0.0"), "1.0.0");
        assert_eq!(line(true, Utf8Path::new("svc"), "1.0.0"), "svc\t1.0.0");
    }
}
