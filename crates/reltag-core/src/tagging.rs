//! Bump-and-tag.
//!
//! [`tag_next_release`] checks every precondition before touching anything,
//! then runs its side effects in a fixed order:
//!
//! 1. save the bumped record
//! 2. run the record's pre-tag command, if any
//! 3. `git add .`
//! 4. `git commit -m <message>`
//! 5. `git tag <new tag>`
//!
//! The first failure stops the sequence. Nothing is rolled back; if some
//! steps already ran, the error is wrapped in [`ReleaseError::Incomplete`]
//! naming them so the operator can finish or revert by hand.

use camino::Utf8PathBuf;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::error::{ReleaseError, ReleaseResult};
use crate::git::{RepositoryInspector, Vcs};
use crate::hooks::{self, HookContext};
use crate::record::ReleaseRecord;
use crate::version::{BumpLevel, VersionVector};

/// Default commit message template.
pub const DEFAULT_COMMIT_MESSAGE: &str = "bumped {base_tag} to release {release}";

/// How to tag.
#[derive(Debug, Clone, Copy)]
pub struct TagOptions<'a> {
    /// Component to bump.
    pub level: BumpLevel,
    /// Report what would happen without saving, committing, or tagging.
    pub dry_run: bool,
    /// Commit message template; see [`DEFAULT_COMMIT_MESSAGE`].
    pub commit_message: &'a str,
}

impl Default for TagOptions<'_> {
    fn default() -> Self {
        Self {
            level: BumpLevel::Patch,
            dry_run: false,
            commit_message: DEFAULT_COMMIT_MESSAGE,
        }
    }
}

/// Non-error result of a tagging attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TagOutcome {
    /// A tag was created, or would have been in a dry run.
    Tagged {
        /// Directory of the record.
        directory: Utf8PathBuf,
        /// Release the tag points at.
        release: VersionVector,
        /// The tag.
        tag: String,
        /// Nothing was actually changed.
        dry_run: bool,
    },
    /// Nothing differs from the recorded tag.
    NoChanges {
        /// Directory of the record.
        directory: Utf8PathBuf,
        /// The unchanged release.
        release: VersionVector,
    },
}

/// Bump `record` by `options.level`, commit, and tag.
///
/// On success (and not a dry run) `record` holds the new release.
#[instrument(skip_all, fields(directory = %record.directory(), level = %options.level, dry_run = options.dry_run))]
pub fn tag_next_release<V: Vcs + ?Sized>(
    record: &mut ReleaseRecord,
    vcs: &V,
    options: &TagOptions<'_>,
) -> ReleaseResult<TagOutcome> {
    let inspector = RepositoryInspector::new(vcs);
    let directory = record.directory().to_path_buf();

    if !inspector.changed_paths()?.is_empty() {
        return Err(ReleaseError::OutstandingChanges { directory });
    }

    let since = inspector.diff_stat_since(record.tag())?;
    if !since.has_changes() {
        debug!(tag = record.tag(), "nothing to release");
        return Ok(TagOutcome::NoChanges {
            directory,
            release: record.release(),
        });
    }
    debug!(%since, "changes since last tag");

    let mut next = record.clone();
    next.next_tag(options.level)?;

    if inspector.has_tag(next.tag())? {
        return Err(ReleaseError::TagExists {
            tag: next.tag().to_string(),
        });
    }

    if options.dry_run {
        info!(tag = next.tag(), "dry run, not tagging");
    } else {
        let context = HookContext {
            release: next.release().to_string(),
            tag: next.tag().to_string(),
            base_tag: next.base_tag().to_string(),
        };
        let message = hooks::interpolate(options.commit_message, &context);
        let mut progress = Progress::new(&directory);

        progress.step("saved record", next.save().map_err(ReleaseError::Save))?;
        if let Some(command) = next.pre_tag_command() {
            let output = hooks::run_pre_tag(command, &context, &directory)
                .map_err(ReleaseError::from);
            let output = progress.step("ran pre-tag command", output)?;
            info!(
                command = %output.command,
                duration_ms = output.duration.as_millis() as u64,
                "pre-tag command finished"
            );
            debug!(
                stdout = output.stdout.trim_end(),
                stderr = output.stderr.trim_end(),
                "pre-tag command output"
            );
        }
        progress.step("staged changes", vcs.run(&["add", "."]).map_err(ReleaseError::from))?;
        progress.step(
            "committed",
            vcs.run(&["commit", "-m", &message]).map_err(ReleaseError::from),
        )?;
        progress.step(
            "tagged",
            vcs.run(&["tag", next.tag()]).map_err(ReleaseError::from),
        )?;
        info!(tag = next.tag(), "release tagged");
    }

    let outcome = TagOutcome::Tagged {
        directory,
        release: next.release(),
        tag: next.tag().to_string(),
        dry_run: options.dry_run,
    };
    if !options.dry_run {
        *record = next;
    }
    Ok(outcome)
}

/// Tag the recorded release as-is, without bumping or committing.
#[instrument(skip_all, fields(directory = %record.directory(), tag = record.tag(), dry_run = dry_run))]
pub fn tag_current_release<V: Vcs + ?Sized>(
    record: &ReleaseRecord,
    vcs: &V,
    dry_run: bool,
) -> ReleaseResult<TagOutcome> {
    let inspector = RepositoryInspector::new(vcs);
    let directory = record.directory().to_path_buf();

    if inspector.has_tag(record.tag())? {
        return Err(ReleaseError::TagExists {
            tag: record.tag().to_string(),
        });
    }
    if !inspector.changed_paths()?.is_empty() {
        return Err(ReleaseError::OutstandingChanges { directory });
    }

    if !dry_run {
        let mut progress = Progress::new(&directory);
        progress.step("saved record", record.save().map_err(ReleaseError::Save))?;
        progress.step(
            "tagged",
            vcs.run(&["tag", record.tag()]).map_err(ReleaseError::from),
        )?;
        info!("current release tagged");
    }

    Ok(TagOutcome::Tagged {
        directory,
        release: record.release(),
        tag: record.tag().to_string(),
        dry_run,
    })
}

/// Tracks completed side effects so a late failure can name them.
struct Progress {
    directory: Utf8PathBuf,
    completed: Vec<&'static str>,
}

impl Progress {
    fn new(directory: &camino::Utf8Path) -> Self {
        Self {
            directory: directory.to_path_buf(),
            completed: Vec::new(),
        }
    }

    fn step<T>(&mut self, name: &'static str, result: ReleaseResult<T>) -> ReleaseResult<T> {
        match result {
            Ok(value) => {
                debug!(step = name, "done");
                self.completed.push(name);
                Ok(value)
            }
            Err(err) if self.completed.is_empty() => Err(err),
            Err(err) => Err(ReleaseError::Incomplete {
                directory: self.directory.clone(),
                completed: self.completed.clone(),
                source: Box::new(err),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::fake::ScriptedVcs;
    use crate::record::DEFAULT_FILE_NAME;
    use camino::Utf8Path;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        dir: Utf8PathBuf,
        record: ReleaseRecord,
    }

    fn fixture(pre_tag_command: Option<&str>) -> Fixture {
        let tmp = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        let record = ReleaseRecord::new(
            dir.join(DEFAULT_FILE_NAME),
            VersionVector::new(1, 2, 3),
            "myapp-1.2.3",
            pre_tag_command.map(str::to_string),
        )
        .unwrap();
        record.save().unwrap();
        Fixture {
            _tmp: tmp,
            dir,
            record,
        }
    }

    fn on_disk(dir: &Utf8Path) -> String {
        fs::read_to_string(dir.join(DEFAULT_FILE_NAME)).unwrap()
    }

    fn changed_repo() -> ScriptedVcs {
        ScriptedVcs::repo("master", "abc1234", &["myapp-1.2.3"])
            .respond("diff --shortstat -r myapp-1.2.3 .", " 1 file changed\n")
    }

    fn minor() -> TagOptions<'static> {
        TagOptions {
            level: BumpLevel::Minor,
            ..TagOptions::default()
        }
    }

    #[test]
    fn bumps_commits_and_tags_in_order() {
        let mut fx = fixture(None);
        let vcs = changed_repo();

        let outcome = tag_next_release(&mut fx.record, &vcs, &minor()).unwrap();

        assert_eq!(
            outcome,
            TagOutcome::Tagged {
                directory: fx.dir.clone(),
                release: VersionVector::new(1, 3, 0),
                tag: "myapp-1.3.0".into(),
                dry_run: false,
            }
        );
        assert_eq!(fx.record.tag(), "myapp-1.3.0");
        assert_eq!(on_disk(&fx.dir), "release=1.3.0\ntag=myapp-1.3.0\n");

        let calls = vcs.calls();
        let add = calls.iter().position(|c| c == "add .").unwrap();
        let commit = calls
            .iter()
            .position(|c| c == "commit -m bumped myapp to release 1.3.0")
            .unwrap();
        let tag = calls.iter().position(|c| c == "tag myapp-1.3.0").unwrap();
        assert!(add < commit && commit < tag);
    }

    #[test]
    fn missing_tag_counts_as_something_to_release() {
        let mut fx = fixture(None);
        let vcs = ScriptedVcs::repo("master", "abc1234", &[]);

        let outcome = tag_next_release(&mut fx.record, &vcs, &TagOptions::default()).unwrap();
        assert!(matches!(outcome, TagOutcome::Tagged { ref tag, .. } if tag == "myapp-1.2.4"));
    }

    #[test]
    fn dirty_tree_fails_before_any_mutation() {
        let mut fx = fixture(None);
        let before = on_disk(&fx.dir);
        let vcs = changed_repo().respond("status -s .", " M main.rs\n");

        let err = tag_next_release(&mut fx.record, &vcs, &minor()).unwrap_err();

        assert!(matches!(err, ReleaseError::OutstandingChanges { .. }));
        assert!(!err.is_fatal());
        assert_eq!(on_disk(&fx.dir), before);
        assert_eq!(fx.record.tag(), "myapp-1.2.3");
        assert!(!vcs.calls().iter().any(|c| c.starts_with("tag ")));
        assert!(!vcs.ran("add ."));
    }

    #[test]
    fn overflowing_bump_fails_before_any_mutation() {
        let tmp = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        let mut record = ReleaseRecord::new(
            dir.join(DEFAULT_FILE_NAME),
            VersionVector::new(1, u64::MAX, 0),
            format!("myapp-1.{}.0", u64::MAX),
            None,
        )
        .unwrap();
        let vcs = ScriptedVcs::repo("master", "abc1234", &[record.tag()])
            .respond(&format!("diff --shortstat -r {} .", record.tag()), " 1 file changed\n");

        let err = tag_next_release(&mut record, &vcs, &minor()).unwrap_err();

        assert!(matches!(err, ReleaseError::Version(_)));
        assert!(!dir.join(DEFAULT_FILE_NAME).exists());
        assert!(!vcs.ran("add ."));
    }

    #[test]
    fn no_changes_since_tag_is_informational() {
        let mut fx = fixture(None);
        let before = on_disk(&fx.dir);
        let vcs = ScriptedVcs::repo("master", "abc1234", &["myapp-1.2.3"]);

        let outcome = tag_next_release(&mut fx.record, &vcs, &minor()).unwrap();

        assert_eq!(
            outcome,
            TagOutcome::NoChanges {
                directory: fx.dir.clone(),
                release: VersionVector::new(1, 2, 3),
            }
        );
        assert_eq!(on_disk(&fx.dir), before);
        assert!(!vcs.calls().iter().any(|c| c.starts_with("tag ")));
    }

    #[test]
    fn existing_target_tag_leaves_record_unchanged() {
        let mut fx = fixture(None);
        let before = on_disk(&fx.dir);
        let vcs = ScriptedVcs::repo("master", "abc1234", &["myapp-1.2.3", "myapp-1.3.0"])
            .respond("diff --shortstat -r myapp-1.2.3 .", " 1 file changed\n");

        let err = tag_next_release(&mut fx.record, &vcs, &minor()).unwrap_err();

        assert!(matches!(err, ReleaseError::TagExists { ref tag } if tag == "myapp-1.3.0"));
        assert_eq!(on_disk(&fx.dir), before);
        assert_eq!(fx.record.release(), VersionVector::new(1, 2, 3));
    }

    #[test]
    fn dry_run_reports_without_side_effects() {
        let mut fx = fixture(Some("touch hook-ran"));
        let before = on_disk(&fx.dir);
        let vcs = changed_repo();
        let options = TagOptions {
            dry_run: true,
            ..minor()
        };

        let outcome = tag_next_release(&mut fx.record, &vcs, &options).unwrap();

        assert!(matches!(outcome, TagOutcome::Tagged { dry_run: true, ref tag, .. } if tag == "myapp-1.3.0"));
        assert_eq!(on_disk(&fx.dir), before);
        assert!(!fx.dir.join("hook-ran").exists());
        assert!(!vcs.ran("add ."));
        assert_eq!(fx.record.tag(), "myapp-1.2.3");
    }

    #[test]
    fn pre_tag_command_sees_new_values() {
        let mut fx = fixture(Some("echo %(tag)s {base_tag} > hook.out"));
        let vcs = changed_repo();

        tag_next_release(&mut fx.record, &vcs, &minor()).unwrap();

        assert_eq!(
            fs::read_to_string(fx.dir.join("hook.out")).unwrap().trim(),
            "myapp-1.3.0 myapp"
        );
    }

    #[test]
    fn failing_hook_is_fatal_and_names_saved_record() {
        let mut fx = fixture(Some("exit 7"));
        let vcs = changed_repo();

        let err = tag_next_release(&mut fx.record, &vcs, &minor()).unwrap_err();

        assert!(err.is_fatal());
        match err {
            ReleaseError::Incomplete {
                completed, source, ..
            } => {
                assert_eq!(completed, vec!["saved record"]);
                assert!(matches!(*source, ReleaseError::PreTagHook(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!vcs.ran("add ."));
        // no rollback: the bumped record stays on disk
        assert!(on_disk(&fx.dir).starts_with("release=1.3.0"));
    }

    #[test]
    fn failing_commit_stops_before_tag() {
        let mut fx = fixture(None);
        let vcs = changed_repo().fail("commit -m bumped myapp to release 1.3.0", 1);

        let err = tag_next_release(&mut fx.record, &vcs, &minor()).unwrap_err();

        match err {
            ReleaseError::Incomplete { completed, .. } => {
                assert_eq!(completed, vec!["saved record", "staged changes"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!vcs.ran("tag myapp-1.3.0"));
    }

    #[test]
    fn query_failure_before_mutation_is_plain_git_error() {
        let mut fx = fixture(None);
        let vcs = ScriptedVcs::new().fail("status -s .", 128);

        let err = tag_next_release(&mut fx.record, &vcs, &minor()).unwrap_err();
        assert!(matches!(err, ReleaseError::Git(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn custom_commit_message_template() {
        let mut fx = fixture(None);
        let vcs = changed_repo();
        let options = TagOptions {
            commit_message: "release {tag}",
            ..minor()
        };

        tag_next_release(&mut fx.record, &vcs, &options).unwrap();
        assert!(vcs.ran("commit -m release myapp-1.3.0"));
    }

    #[test]
    fn current_release_tags_without_commit() {
        let fx = fixture(None);
        let vcs = ScriptedVcs::repo("master", "abc1234", &[]);

        let outcome = tag_current_release(&fx.record, &vcs, false).unwrap();

        assert!(matches!(outcome, TagOutcome::Tagged { ref tag, dry_run: false, .. } if tag == "myapp-1.2.3"));
        assert!(vcs.ran("tag myapp-1.2.3"));
        assert!(!vcs.calls().iter().any(|c| c.starts_with("commit")));
    }

    #[test]
    fn current_release_rejects_existing_tag() {
        let fx = fixture(None);
        let vcs = ScriptedVcs::repo("master", "abc1234", &["myapp-1.2.3"]);

        let err = tag_current_release(&fx.record, &vcs, false).unwrap_err();
        assert!(matches!(err, ReleaseError::TagExists { .. }));
    }

    #[test]
    fn current_release_requires_clean_tree() {
        let fx = fixture(None);
        let vcs = ScriptedVcs::repo("master", "abc1234", &[]).respond("status -s .", "?? x\n");

        let err = tag_current_release(&fx.record, &vcs, false).unwrap_err();
        assert!(matches!(err, ReleaseError::OutstandingChanges { .. }));
        assert!(!vcs.ran("tag myapp-1.2.3"));
    }
}
