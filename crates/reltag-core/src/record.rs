//! Per-directory release records.
//!
//! A record is a small `key=value` file (`.release` by default) sitting in
//! the directory it describes:
//!
//! ```text
//! # comments and blank lines are ignored
//! release=1.2.3
//! tag=myapp-1.2.3
//! pre_tag_command=make VERSION={release} dist
//! ```
//!
//! The `tag` must contain the `release` text. Removing it (plus one dangling
//! `-`) yields the *base tag*, the stable prefix every future tag is built
//! from.

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::version::{BumpLevel, VersionError, VersionResult, VersionVector};

/// Default record file name.
pub const DEFAULT_FILE_NAME: &str = ".release";

const KEY_RELEASE: &str = "release";
const KEY_TAG: &str = "tag";
const KEY_PRE_TAG_COMMAND: &str = "pre_tag_command";

/// Errors from reading, writing, or creating release records.
#[derive(Error, Debug)]
pub enum RecordError {
    /// The record text is malformed.
    #[error("{path}: {message}")]
    Format {
        /// Record file.
        path: Utf8PathBuf,
        /// What is wrong with it.
        message: String,
    },

    /// The release value is not a valid version.
    #[error("{path}: {source}")]
    Version {
        /// Record file.
        path: Utf8PathBuf,
        /// Underlying parse failure.
        source: VersionError,
    },

    /// A required key is absent.
    #[error("{path} does not contain a {field} value")]
    MissingField {
        /// Record file.
        path: Utf8PathBuf,
        /// The missing key.
        field: &'static str,
    },

    /// The initialize target is not a directory.
    #[error("{0} is not a directory.")]
    NotADirectory(Utf8PathBuf),

    /// Reading or writing the record failed.
    #[error("{path}: {source}")]
    Io {
        /// Record file.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Result alias for record operations.
pub type RecordResult<T> = Result<T, RecordError>;

/// Release metadata for one directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseRecord {
    path: Utf8PathBuf,
    release: VersionVector,
    tag: String,
    base_tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pre_tag_command: Option<String>,
}

/// Result of [`initialize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    /// A new record was written.
    Created(ReleaseRecord),
    /// A record already exists; nothing was touched.
    AlreadyInitialized(Utf8PathBuf),
}

impl ReleaseRecord {
    /// Build a record, checking that `tag` contains the release text.
    pub fn new(
        path: impl Into<Utf8PathBuf>,
        release: VersionVector,
        tag: impl Into<String>,
        pre_tag_command: Option<String>,
    ) -> RecordResult<Self> {
        let path = path.into();
        let tag = tag.into();
        let base_tag = base_tag_of(&tag, &release.to_string()).ok_or_else(|| {
            RecordError::Format {
                path: path.clone(),
                message: format!("tag {tag:?} does not contain release {release}"),
            }
        })?;

        Ok(Self {
            path,
            release,
            tag,
            base_tag,
            pre_tag_command,
        })
    }

    /// Read a record file.
    #[instrument]
    pub fn load(path: &Utf8Path) -> RecordResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| RecordError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &text)
    }

    /// Parse record text. `path` is only used for error messages and later saves.
    pub fn parse(path: &Utf8Path, text: &str) -> RecordResult<Self> {
        let mut release = None;
        let mut tag = None;
        let mut pre_tag_command = None;

        for (index, line) in text.lines().enumerate() {
            let line = line.trim_end();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(RecordError::Format {
                    path: path.to_path_buf(),
                    message: format!("line {} is not a key=value pair", index + 1),
                });
            };

            match key.trim() {
                KEY_RELEASE => release = Some(value.to_string()),
                KEY_TAG => tag = Some(value.to_string()),
                KEY_PRE_TAG_COMMAND => pre_tag_command = Some(value.to_string()),
                other => debug!(key = other, "ignoring unknown record key"),
            }
        }

        let release = release.ok_or_else(|| RecordError::MissingField {
            path: path.to_path_buf(),
            field: KEY_RELEASE,
        })?;
        let tag = tag.ok_or_else(|| RecordError::MissingField {
            path: path.to_path_buf(),
            field: KEY_TAG,
        })?;
        let release = VersionVector::parse(&release).map_err(|source| RecordError::Version {
            path: path.to_path_buf(),
            source,
        })?;

        Self::new(path, release, tag, pre_tag_command)
    }

    /// Write the record back, replacing the file atomically.
    #[instrument(skip(self), fields(path = %self.path, release = %self.release))]
    pub fn save(&self) -> RecordResult<()> {
        let io_err = |source| RecordError::Io {
            path: self.path.clone(),
            source,
        };

        // NamedTempFile is created owner-only.
        let permissions = std::fs::metadata(&self.path)
            .map(|meta| meta.permissions())
            .ok()
            .or_else(new_record_permissions);

        let dir = self.directory();
        let mut file = tempfile::NamedTempFile::new_in(dir.as_std_path()).map_err(io_err)?;
        if let Some(permissions) = permissions {
            file.as_file().set_permissions(permissions).map_err(io_err)?;
        }
        file.write_all(self.render().as_bytes()).map_err(io_err)?;
        file.persist(self.path.as_std_path())
            .map_err(|e| io_err(e.error))?;

        debug!("record saved");
        Ok(())
    }

    /// The on-disk text of this record.
    pub fn render(&self) -> String {
        let mut out = format!("{KEY_RELEASE}={}\n{KEY_TAG}={}\n", self.release, self.tag);
        if let Some(ref command) = self.pre_tag_command {
            out.push_str(&format!("{KEY_PRE_TAG_COMMAND}={command}\n"));
        }
        out
    }

    /// Advance the release by `level` and rebuild the tag from the base tag.
    ///
    /// Only the in-memory record changes; call [`save`](Self::save) to persist.
    /// On overflow the record is left as it was.
    pub fn next_tag(&mut self, level: BumpLevel) -> VersionResult<()> {
        self.release = self.release.bump(level)?;
        self.tag = if self.base_tag.is_empty() {
            self.release.to_string()
        } else {
            format!("{}-{}", self.base_tag, self.release)
        };
        Ok(())
    }

    /// Path of the record file.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Directory the record describes.
    pub fn directory(&self) -> &Utf8Path {
        match self.path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent,
            _ => Utf8Path::new("."),
        }
    }

    /// Recorded release.
    pub const fn release(&self) -> VersionVector {
        self.release
    }

    /// Tag name for the recorded release.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Tag with the release text removed.
    pub fn base_tag(&self) -> &str {
        &self.base_tag
    }

    /// Optional command run before committing and tagging.
    pub fn pre_tag_command(&self) -> Option<&str> {
        self.pre_tag_command.as_deref()
    }
}

#[cfg(unix)]
fn new_record_permissions() -> Option<std::fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(std::fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_record_permissions() -> Option<std::fs::Permissions> {
    None
}

/// Remove the first occurrence of `release` from `tag`, then one trailing `-`.
///
/// Returns `None` when `tag` does not contain `release`.
pub fn base_tag_of(tag: &str, release: &str) -> Option<String> {
    if !tag.contains(release) {
        return None;
    }
    let stripped = tag.replacen(release, "", 1);
    Some(
        stripped
            .strip_suffix('-')
            .map_or_else(|| stripped.clone(), str::to_string),
    )
}

/// Create a record in `directory` starting at `starting_release`.
///
/// The tag is `<directory name>-<release>`. An existing record is left
/// untouched and reported as [`InitOutcome::AlreadyInitialized`].
#[instrument]
pub fn initialize(
    directory: &Utf8Path,
    starting_release: &str,
    file_name: &str,
) -> RecordResult<InitOutcome> {
    if !directory.is_dir() {
        return Err(RecordError::NotADirectory(directory.to_path_buf()));
    }

    let path = directory.join(file_name);
    let release = VersionVector::parse(starting_release).map_err(|source| {
        RecordError::Version {
            path: path.clone(),
            source,
        }
    })?;

    if path.exists() {
        debug!("record already present");
        return Ok(InitOutcome::AlreadyInitialized(directory.to_path_buf()));
    }

    let absolute = directory
        .canonicalize_utf8()
        .map_err(|source| RecordError::Io {
            path: path.clone(),
            source,
        })?;
    let tag = absolute
        .file_name()
        .map_or_else(|| release.to_string(), |name| format!("{name}-{release}"));

    let record = ReleaseRecord::new(path, release, tag, None)?;
    record.save()?;
    info!(tag = record.tag(), "record initialized");

    Ok(InitOutcome::Created(record))
}
