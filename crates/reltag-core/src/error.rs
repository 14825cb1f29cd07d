//! Error types shared across reltag-core.

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::git::GitError;
use crate::hooks::HookError;
use crate::record::RecordError;
use crate::version::VersionError;

/// Errors that can occur when working with configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error("invalid configuration: {0}")]
    Deserialize(#[from] Box<figment::Error>),
}

/// Result type alias using [`ConfigError`].
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors from showing, bumping, or tagging a directory's release.
///
/// Validation failures are reported per directory and a batch moves on.
/// [`is_fatal`](Self::is_fatal) errors mean git or the working tree may be
/// half-updated, so the whole run stops.
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Malformed version text, or a bump past the largest release.
    #[error(transparent)]
    Version(#[from] VersionError),

    /// The record could not be read, parsed, or created.
    #[error(transparent)]
    Record(#[from] RecordError),

    /// The working tree has uncommitted changes.
    #[error("{directory} still has outstanding changes.")]
    OutstandingChanges {
        /// Directory that must be clean.
        directory: Utf8PathBuf,
    },

    /// The tag to create already exists.
    #[error("tag {tag} already exists.")]
    TagExists {
        /// The existing tag.
        tag: String,
    },

    /// A git command failed.
    #[error(transparent)]
    Git(#[from] GitError),

    /// The pre-tag command failed.
    #[error(transparent)]
    PreTagHook(#[from] HookError),

    /// Writing the updated record failed.
    #[error("failed to save release record: {0}")]
    Save(#[source] RecordError),

    /// A fatal error after some tagging steps had already run.
    #[error("{directory}: {source}; already completed: {}; finish or revert by hand", completed.join(", "))]
    Incomplete {
        /// Directory being tagged.
        directory: Utf8PathBuf,
        /// Steps that succeeded before the failure, in order.
        completed: Vec<&'static str>,
        /// The failure.
        #[source]
        source: Box<Self>,
    },
}

impl ReleaseError {
    /// Whether the run must stop instead of moving to the next directory.
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Git(_) | Self::PreTagHook(_) | Self::Save(_) | Self::Incomplete { .. }
        )
    }
}

/// Result alias for release workflows.
pub type ReleaseResult<T> = Result<T, ReleaseError>;
