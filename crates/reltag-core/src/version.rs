//! Three-part release versions and the bump rule.
//!
//! Release records carry a plain `major.minor.patch` triple. Pre-release
//! and build metadata are not part of the format, so parsing is strict:
//! exactly three dot-separated non-negative integers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from version operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// Text is not a `major.minor.patch` triple.
    #[error("release {0:?} should match major.minor.patch")]
    Format(String),

    /// Unknown bump level.
    #[error("can only bump patch, minor or major levels, not {0:?}")]
    InvalidLevel(String),

    /// The bumped component would not fit in a `u64`.
    #[error("cannot bump the {level} level of release {version}")]
    Overflow {
        /// Release being bumped.
        version: VersionVector,
        /// Requested level.
        level: BumpLevel,
    },
}

/// Result alias for version operations.
pub type VersionResult<T> = Result<T, VersionError>;

/// Which component of a release to increment.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum BumpLevel {
    /// Patch release (x.y.Z).
    #[default]
    Patch,
    /// Minor release (x.Y.0).
    Minor,
    /// Major release (X.0.0).
    Major,
}

impl fmt::Display for BumpLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Patch => write!(f, "patch"),
            Self::Minor => write!(f, "minor"),
            Self::Major => write!(f, "major"),
        }
    }
}

impl FromStr for BumpLevel {
    type Err = VersionError;

    fn from_str(s: &str) -> VersionResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "patch" => Ok(Self::Patch),
            "minor" => Ok(Self::Minor),
            "major" => Ok(Self::Major),
            _ => Err(VersionError::InvalidLevel(s.to_string())),
        }
    }
}

/// A `major.minor.patch` release number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct VersionVector {
    /// Major component.
    pub major: u64,
    /// Minor component.
    pub minor: u64,
    /// Patch component.
    pub patch: u64,
}

impl VersionVector {
    /// Create a version from its three components.
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse `major.minor.patch`.
    ///
    /// Leading zeros are accepted (`01.2.3` is `1.2.3`); signs, whitespace,
    /// and any fourth component are not.
    pub fn parse(text: &str) -> VersionResult<Self> {
        let mut parts = text.split('.');
        let (Some(major), Some(minor), Some(patch), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(VersionError::Format(text.to_string()));
        };

        let component = |part: &str| {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(VersionError::Format(text.to_string()));
            }
            part.parse::<u64>()
                .map_err(|_| VersionError::Format(text.to_string()))
        };

        Ok(Self::new(component(major)?, component(minor)?, component(patch)?))
    }

    /// Apply a bump level, zeroing the lower components.
    pub const fn bump(self, level: BumpLevel) -> VersionResult<Self> {
        let bumped = match level {
            BumpLevel::Patch => match self.patch.checked_add(1) {
                Some(patch) => Some(Self::new(self.major, self.minor, patch)),
                None => None,
            },
            BumpLevel::Minor => match self.minor.checked_add(1) {
                Some(minor) => Some(Self::new(self.major, minor, 0)),
                None => None,
            },
            BumpLevel::Major => match self.major.checked_add(1) {
                Some(major) => Some(Self::new(major, 0, 0)),
                None => None,
            },
        };
        match bumped {
            Some(next) => Ok(next),
            None => Err(VersionError::Overflow {
                version: self,
                level,
            }),
        }
    }
}

impl fmt::Display for VersionVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for VersionVector {
    type Err = VersionError;

    fn from_str(s: &str) -> VersionResult<Self> {
        Self::parse(s)
    }
}

impl From<VersionVector> for String {
    fn from(version: VersionVector) -> Self {
        version.to_string()
    }
}

impl TryFrom<String> for VersionVector {
    type Error = VersionError;

    fn try_from(value: String) -> VersionResult<Self> {
        Self::parse(&value)
    }
}
