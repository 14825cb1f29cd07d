//! The "current release" descriptor: what is actually checked out, compared
//! with the clean release in the record.
//!
//! | state                          | shown as                        |
//! |--------------------------------|---------------------------------|
//! | clean, tagged, unchanged       | `1.2.3`                         |
//! | commits since tag (or no tag)  | `1.2.3-abc1234`                 |
//! | uncommitted changes            | `1.2.3-abc1234-dirty`           |
//! | any of the above off-default   | `1.2.3-abc1234@feature`         |

use std::fmt;

use serde::Serialize;

use crate::git::RepositorySnapshot;
use crate::record::ReleaseRecord;
use crate::version::VersionVector;

/// A release decorated with live repository state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentRelease {
    /// The clean release from the record.
    pub release: VersionVector,
    /// The decorated descriptor.
    pub current: String,
    /// The directory has uncommitted changes.
    pub dirty: bool,
    /// The working tree differs from the recorded tag, or the tag is missing.
    pub changed_since_tag: bool,
    /// Checked-out branch.
    pub branch: String,
}

impl CurrentRelease {
    /// Combine a record with a snapshot taken for its tag.
    pub fn derive(
        record: &ReleaseRecord,
        snapshot: &RepositorySnapshot,
        default_branch: &str,
    ) -> Self {
        Self {
            release: record.release(),
            current: describe(record.release(), snapshot, default_branch),
            dirty: snapshot.is_dirty(),
            changed_since_tag: snapshot.since_tag.has_changes(),
            branch: snapshot.branch.clone(),
        }
    }
}

impl fmt::Display for CurrentRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.current)
    }
}

/// Build the descriptor string.
///
/// Dirty always includes the commit id. The branch is appended only when
/// the result already differs from the bare release.
pub fn describe(release: VersionVector, snapshot: &RepositorySnapshot, default_branch: &str) -> String {
    let bare = release.to_string();
    let rev = &snapshot.short_revision;

    let mut current = if snapshot.is_dirty() {
        format!("{bare}-{rev}-dirty")
    } else if snapshot.since_tag.has_changes() {
        format!("{bare}-{rev}")
    } else {
        bare.clone()
    };

    if current != bare && snapshot.branch != default_branch {
        current.push('@');
        current.push_str(&snapshot.branch);
    }
    current
}
