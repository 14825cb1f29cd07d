//! One operation on one directory, as the command line runs it.
//!
//! Every call loads the record and binds a fresh [`Git`]; nothing is
//! carried between directories or commands.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::instrument;

use crate::batch::Report;
use crate::config::ReleaseConfig;
use crate::error::ReleaseResult;
use crate::git::{Git, RepositoryInspector};
use crate::record::{self, InitOutcome, ReleaseRecord};
use crate::state::CurrentRelease;
use crate::tagging::{self, TagOptions, TagOutcome};
use crate::version::BumpLevel;

/// `show` result for one directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shown {
    /// Directory as given.
    pub directory: Utf8PathBuf,
    /// Recorded tag.
    pub tag: String,
    /// Release with live state.
    #[serde(flatten)]
    pub current: CurrentRelease,
}

/// `next` result for one directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Next {
    /// Directory as given.
    pub directory: Utf8PathBuf,
    /// Release after the bump.
    pub release: crate::version::VersionVector,
    /// Tag after the bump.
    pub tag: String,
}

/// `init` result for one directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Initialized {
    /// Directory as given.
    pub directory: Utf8PathBuf,
    /// Whether a new record was written.
    pub created: bool,
    /// The record, when one was created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<ReleaseRecord>,
}

/// Load the record in `directory`.
pub fn load_record(directory: &Utf8Path, config: &ReleaseConfig) -> ReleaseResult<ReleaseRecord> {
    Ok(ReleaseRecord::load(&directory.join(&config.file_name))?)
}

/// The current release of `directory`.
#[instrument(skip(config))]
pub fn show_current(directory: &Utf8Path, config: &ReleaseConfig) -> ReleaseResult<Shown> {
    let record = load_record(directory, config)?;
    let git = Git::new(record.directory())?;
    let snapshot = RepositoryInspector::new(&git)
        .with_default_branch(&config.default_branch)
        .snapshot(record.tag())?;

    Ok(Shown {
        directory: directory.to_path_buf(),
        tag: record.tag().to_string(),
        current: CurrentRelease::derive(&record, &snapshot, &config.default_branch),
    })
}

/// The release `directory` would get from a bump. Touches neither disk nor git.
#[instrument(skip(config))]
pub fn show_next(
    directory: &Utf8Path,
    config: &ReleaseConfig,
    level: BumpLevel,
) -> ReleaseResult<Next> {
    let mut record = load_record(directory, config)?;
    record.next_tag(level)?;
    Ok(Next {
        directory: directory.to_path_buf(),
        release: record.release(),
        tag: record.tag().to_string(),
    })
}

/// Bump and tag `directory`, adding the outcome to `report`.
#[instrument(skip(config, report))]
pub fn tag_next(
    directory: &Utf8Path,
    config: &ReleaseConfig,
    level: BumpLevel,
    dry_run: bool,
    report: &mut Report,
) -> ReleaseResult<TagOutcome> {
    let mut record = load_record(directory, config)?;
    let git = Git::new(record.directory())?;
    let options = TagOptions {
        level,
        dry_run,
        commit_message: &config.commit_message,
    };

    let outcome = tagging::tag_next_release(&mut record, &git, &options)?;
    report_outcome(directory, &outcome, report);
    Ok(outcome)
}

/// Tag the recorded release of `directory` without bumping.
#[instrument(skip(config, report))]
pub fn tag_current(
    directory: &Utf8Path,
    config: &ReleaseConfig,
    dry_run: bool,
    report: &mut Report,
) -> ReleaseResult<TagOutcome> {
    let record = load_record(directory, config)?;
    let git = Git::new(record.directory())?;

    let outcome = tagging::tag_current_release(&record, &git, dry_run)?;
    report_outcome(directory, &outcome, report);
    Ok(outcome)
}

/// Create a record in `directory` starting at `release`.
#[instrument(skip(config, report))]
pub fn initialize(
    directory: &Utf8Path,
    release: &str,
    config: &ReleaseConfig,
    report: &mut Report,
) -> ReleaseResult<Initialized> {
    Ok(match record::initialize(directory, release, &config.file_name)? {
        InitOutcome::Created(record) => Initialized {
            directory: directory.to_path_buf(),
            created: true,
            record: Some(record),
        },
        InitOutcome::AlreadyInitialized(_) => {
            report.info(directory, format!("{directory} is already initialized."));
            Initialized {
                directory: directory.to_path_buf(),
                created: false,
                record: None,
            }
        }
    })
}

fn report_outcome(directory: &Utf8Path, outcome: &TagOutcome, report: &mut Report) {
    let text = match outcome {
        TagOutcome::Tagged {
            release,
            dry_run: false,
            ..
        } => format!("{directory} tagged with release {release}."),
        TagOutcome::Tagged {
            release,
            dry_run: true,
            ..
        } => format!("{directory} would be tagged with release {release}."),
        TagOutcome::NoChanges { release, .. } => {
            format!("{directory} has no changes since {release}.")
        }
    };
    report.info(directory, text);
}
