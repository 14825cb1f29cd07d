//! Process several directories one after another, collecting messages.
//!
//! Validation errors are recorded in the [`Report`] and processing moves on
//! to the next directory. A fatal error ends the batch immediately.

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{error, warn};

use crate::error::ReleaseResult;

/// Message class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A non-error outcome worth telling the user about.
    Info,
    /// A failure for one directory.
    Error,
}

/// One line of user-facing output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    /// Class of the message.
    pub severity: Severity,
    /// Directory the message is about.
    pub directory: Utf8PathBuf,
    /// Message text without the severity prefix.
    pub text: String,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Info => write!(f, "INFO: {}", self.text),
            Severity::Error => write!(f, "ERROR: {}", self.text),
        }
    }
}

/// Messages accumulated over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    messages: Vec<Message>,
}

impl Report {
    /// Empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an informational message.
    pub fn info(&mut self, directory: &Utf8Path, text: impl Into<String>) {
        self.push(Severity::Info, directory, text.into());
    }

    /// Record an error.
    pub fn error(&mut self, directory: &Utf8Path, text: impl Into<String>) {
        self.push(Severity::Error, directory, text.into());
    }

    fn push(&mut self, severity: Severity, directory: &Utf8Path, text: String) {
        self.messages.push(Message {
            severity,
            directory: directory.to_path_buf(),
            text,
        });
    }

    /// Whether any error was recorded. Drives the exit status.
    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|m| m.severity == Severity::Error)
    }

    /// All messages in the order they were recorded.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Recorded errors only.
    pub fn errors(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.severity == Severity::Error)
    }
}

/// Run `process` for each directory in order.
///
/// Returns the successful results. A recoverable error is added to `report`
/// and the next directory is processed; a fatal one is returned at once.
pub fn for_each_directory<T, F>(
    directories: &[Utf8PathBuf],
    report: &mut Report,
    mut process: F,
) -> ReleaseResult<Vec<T>>
where
    F: FnMut(&Utf8Path, &mut Report) -> ReleaseResult<T>,
{
    let mut results = Vec::with_capacity(directories.len());
    for directory in directories {
        match process(directory, report) {
            Ok(value) => results.push(value),
            Err(err) if err.is_fatal() => {
                error!(%directory, error = %err, "fatal error, stopping");
                return Err(err);
            }
            Err(err) => {
                warn!(%directory, error = %err, "directory failed");
                report.error(directory, err.to_string());
            }
        }
    }
    Ok(results)
}
