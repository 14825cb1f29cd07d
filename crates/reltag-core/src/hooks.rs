//! The pre-tag hook.
//!
//! A record may carry a `pre_tag_command`, run through `sh -c` in the
//! record's directory after the bumped record is saved and before the
//! commit. Placeholders come in two spellings, both accepted:
//! `{release}` / `{tag}` / `{base_tag}` and `%(release)s` / `%(tag)s` /
//! `%(base_tag)s`.

use std::process::Command;
use std::time::{Duration, Instant};

use camino::Utf8Path;
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors from hook execution.
#[derive(Error, Debug)]
pub enum HookError {
    /// The command exited with a non-zero status.
    #[error("pre-tag command {command:?} returned {code}, output {stderr}", code = exit_label(.exit_code))]
    CommandFailed {
        /// The command as written in the record.
        command: String,
        /// The exit code, if available.
        exit_code: Option<i32>,
        /// Captured stderr.
        stderr: String,
    },

    /// The shell could not be started.
    #[error("failed to execute pre-tag command: {0}")]
    Exec(#[from] std::io::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "a signal".to_string(), |c| c.to_string())
}

/// Result alias for hook operations.
pub type HookResult<T> = Result<T, HookError>;

/// Values substituted into the command.
#[derive(Debug, Clone)]
pub struct HookContext {
    /// The new release (e.g. `1.3.0`).
    pub release: String,
    /// The new tag (e.g. `myapp-1.3.0`).
    pub tag: String,
    /// The base tag (e.g. `myapp`).
    pub base_tag: String,
}

/// Result of a successful hook run.
#[derive(Debug, Clone)]
pub struct HookOutput {
    /// The command as written, before substitution.
    pub command: String,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
    /// Wall time.
    pub duration: Duration,
}

/// Run `command` with placeholders filled from `context`, in `directory`.
#[instrument(skip(context), fields(release = %context.release))]
pub fn run_pre_tag(
    command: &str,
    context: &HookContext,
    directory: &Utf8Path,
) -> HookResult<HookOutput> {
    let interpolated = interpolate(command, context);
    debug!(%interpolated, "running pre-tag command");

    let start = Instant::now();
    let output = Command::new("sh")
        .args(["-c", &interpolated])
        .current_dir(directory.as_std_path())
        .output()?;
    let duration = start.elapsed();

    if !output.status.success() {
        return Err(HookError::CommandFailed {
            command: command.to_string(),
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(HookOutput {
        command: command.to_string(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        duration,
    })
}

/// Fill both placeholder spellings. Unknown placeholders are left alone.
pub fn interpolate(command: &str, context: &HookContext) -> String {
    let values = [
        ("release", context.release.as_str()),
        ("tag", context.tag.as_str()),
        ("base_tag", context.base_tag.as_str()),
    ];
    values.iter().fold(command.to_string(), |acc, (name, value)| {
        acc.replace(&format!("{{{name}}}"), value)
            .replace(&format!("%({name})s"), value)
    })
}
