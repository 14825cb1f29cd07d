//! Git queries and commands scoped to one managed directory.
//!
//! Everything shells out to the `git` binary so the user's SSH keys, GPG
//! signing, hooks, and other configuration apply. Nothing is cached: each
//! [`RepositoryInspector`] call runs a fresh command.

use std::path::PathBuf;
use std::process::Command;

use camino::Utf8PathBuf;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

/// Branch assumed when none is marked current.
pub const DEFAULT_BRANCH: &str = "master";

/// Reported instead of a diff when the reference tag does not exist.
pub const TAG_MISSING: &str = "tag is missing";

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    /// The `git` binary is not on `PATH`.
    #[error("git not found: {0}")]
    NotFound(#[from] which::Error),

    /// Failed to execute the `git` command.
    #[error("failed to run git: {0}")]
    Exec(#[from] std::io::Error),

    /// `git` returned a non-zero exit code.
    #[error("git {command} in {directory} returned {code}, output {stderr}", code = exit_label(.exit_code))]
    Command {
        /// Arguments passed to git.
        command: String,
        /// Working directory of the invocation.
        directory: Utf8PathBuf,
        /// Exit code, if the process was not killed by a signal.
        exit_code: Option<i32>,
        /// Captured stderr.
        stderr: String,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "no exit code".to_string(), |c| c.to_string())
}

/// Result alias for git operations.
pub type GitResult<T> = Result<T, GitError>;

/// A version control backend that runs commands in a fixed directory.
pub trait Vcs {
    /// Run one command and return its stdout. Non-zero exit is an error.
    fn run(&self, args: &[&str]) -> GitResult<String>;
}

/// The `git` command-line client, bound to a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    program: PathBuf,
    directory: Utf8PathBuf,
}

impl Git {
    /// Locate `git` on `PATH` and bind it to `directory`.
    pub fn new(directory: impl Into<Utf8PathBuf>) -> GitResult<Self> {
        let program = which::which("git")?;
        Ok(Self {
            program,
            directory: directory.into(),
        })
    }
}

impl Vcs for Git {
    fn run(&self, args: &[&str]) -> GitResult<String> {
        debug!(args = ?args, directory = %self.directory, "git");
        let output = Command::new(&self.program)
            .args(args)
            .current_dir(self.directory.as_std_path())
            .output()?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(GitError::Command {
                command: args.join(" "),
                directory: self.directory.clone(),
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

/// Difference between the working tree and a reference tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "stat", rename_all = "snake_case")]
pub enum SinceTag {
    /// The tag does not exist.
    TagMissing,
    /// No differences.
    Unchanged,
    /// The `--shortstat` summary of what changed.
    Changed(String),
}

impl SinceTag {
    /// Whether there is anything to release relative to the tag.
    ///
    /// A missing tag counts as changed.
    pub const fn has_changes(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

impl std::fmt::Display for SinceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TagMissing => f.write_str(TAG_MISSING),
            Self::Unchanged => Ok(()),
            Self::Changed(stat) => f.write_str(stat),
        }
    }
}

/// Repository state gathered once for a display or tagging decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositorySnapshot {
    /// Checked-out branch.
    pub branch: String,
    /// Abbreviated `HEAD` commit id.
    pub short_revision: String,
    /// All tag names, in git's order.
    pub tags: Vec<String>,
    /// `git status -s` entries for the directory; empty means clean.
    pub changed_paths: Vec<String>,
    /// Difference from the recorded tag.
    pub since_tag: SinceTag,
}

impl RepositorySnapshot {
    /// Whether the directory has uncommitted changes.
    pub fn is_dirty(&self) -> bool {
        !self.changed_paths.is_empty()
    }
}

/// Read-only repository queries.
#[derive(Debug)]
pub struct RepositoryInspector<'a, V: Vcs + ?Sized> {
    vcs: &'a V,
    default_branch: &'a str,
}

impl<'a, V: Vcs + ?Sized> RepositoryInspector<'a, V> {
    /// Inspect through `vcs`.
    pub const fn new(vcs: &'a V) -> Self {
        Self {
            vcs,
            default_branch: DEFAULT_BRANCH,
        }
    }

    /// Branch reported when `git branch` marks none as current.
    pub const fn with_default_branch(mut self, branch: &'a str) -> Self {
        self.default_branch = branch;
        self
    }

    /// The branch marked `*` in `git branch`.
    #[instrument(skip(self))]
    pub fn current_branch(&self) -> GitResult<String> {
        let output = self.vcs.run(&["branch"])?;
        let branch = output
            .lines()
            .find_map(|line| line.strip_prefix('*'))
            .map_or_else(|| self.default_branch.to_string(), |b| b.trim().to_string());
        debug!(%branch, "current branch");
        Ok(branch)
    }

    /// Abbreviated `HEAD` commit id.
    #[instrument(skip(self))]
    pub fn short_revision(&self) -> GitResult<String> {
        Ok(self.vcs.run(&["rev-parse", "--short", "HEAD"])?.trim_end().to_string())
    }

    /// Short-status entries for the directory.
    #[instrument(skip(self))]
    pub fn changed_paths(&self) -> GitResult<Vec<String>> {
        let paths = non_empty_lines(&self.vcs.run(&["status", "-s", "."])?);
        debug!(count = paths.len(), "changed paths");
        Ok(paths)
    }

    /// Every tag in the repository.
    #[instrument(skip(self))]
    pub fn all_tags(&self) -> GitResult<Vec<String>> {
        Ok(non_empty_lines(&self.vcs.run(&["tag"])?))
    }

    /// Whether `tag` already exists.
    pub fn has_tag(&self, tag: &str) -> GitResult<bool> {
        Ok(self.all_tags()?.iter().any(|t| t == tag))
    }

    /// Shortstat diff between `tag` and the working tree, limited to the directory.
    #[instrument(skip(self))]
    pub fn diff_stat_since(&self, tag: &str) -> GitResult<SinceTag> {
        let tags = self.all_tags()?;
        self.diff_against(tag, &tags)
    }

    /// Gather everything needed to describe the directory relative to `tag`.
    #[instrument(skip(self))]
    pub fn snapshot(&self, tag: &str) -> GitResult<RepositorySnapshot> {
        let branch = self.current_branch()?;
        let tags = self.all_tags()?;
        let short_revision = self.short_revision()?;
        let changed_paths = self.changed_paths()?;
        let since_tag = self.diff_against(tag, &tags)?;

        Ok(RepositorySnapshot {
            branch,
            short_revision,
            tags,
            changed_paths,
            since_tag,
        })
    }

    fn diff_against(&self, tag: &str, tags: &[String]) -> GitResult<SinceTag> {
        if !tags.iter().any(|t| t == tag) {
            debug!(tag, "reference tag missing");
            return Ok(SinceTag::TagMissing);
        }

        let stat = self.vcs.run(&["diff", "--shortstat", "-r", tag, "."])?;
        let stat = stat.trim();
        Ok(if stat.is_empty() {
            SinceTag::Unchanged
        } else {
            SinceTag::Changed(stat.to_string())
        })
    }
}

fn non_empty_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Scripted [`Vcs`] for exercising the inspector and workflows without a repository.
#[cfg(test)]
pub(crate) mod fake {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::{GitError, GitResult, Vcs};

    /// Answers commands from a table keyed by the space-joined arguments.
    ///
    /// Unscripted commands succeed with empty output.
    #[derive(Debug, Default)]
    pub struct ScriptedVcs {
        responses: HashMap<String, Result<String, i32>>,
        calls: RefCell<Vec<String>>,
    }

    impl ScriptedVcs {
        pub fn new() -> Self {
            Self::default()
        }

        /// A clean checkout of `branch` at `revision` holding `tags`.
        pub fn repo(branch: &str, revision: &str, tags: &[&str]) -> Self {
            let mut listing: String = tags.iter().map(|t| format!("{t}\n")).collect();
            if listing.is_empty() {
                listing.push('\n');
            }
            Self::new()
                .respond("branch", &format!("  other\n* {branch}\n"))
                .respond("rev-parse --short HEAD", &format!("{revision}\n"))
                .respond("tag", &listing)
        }

        pub fn respond(mut self, args: &str, output: &str) -> Self {
            self.responses.insert(args.to_string(), Ok(output.to_string()));
            self
        }

        pub fn fail(mut self, args: &str, exit_code: i32) -> Self {
            self.responses.insert(args.to_string(), Err(exit_code));
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }

        pub fn ran(&self, args: &str) -> bool {
            self.calls.borrow().iter().any(|c| c == args)
        }
    }

    impl Vcs for ScriptedVcs {
        fn run(&self, args: &[&str]) -> GitResult<String> {
            let key = args.join(" ");
            self.calls.borrow_mut().push(key.clone());
            match self.responses.get(&key) {
                Some(Ok(output)) => Ok(output.clone()),
                Some(Err(code)) => Err(GitError::Command {
                    command: key,
                    directory: "scripted".into(),
                    exit_code: Some(*code),
                    stderr: "scripted failure".into(),
                }),
                None => Ok(String::new()),
            }
        }
    }
}
