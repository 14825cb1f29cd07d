//! Core library for reltag.
//!
//! Tracks a `major.minor.patch` release per directory in a small record
//! file, describes what is currently checked out relative to that release,
//! and bumps, commits, and tags new releases through git.
//!
//! # Modules
//!
//! - [`version`] - Release numbers and the bump rule
//! - [`record`] - Per-directory release records
//! - [`git`] - The `Vcs` seam and read-only repository queries
//! - [`state`] - The decorated "current release" string
//! - [`tagging`] - Bump-and-tag
//! - [`hooks`] - The pre-tag command
//! - [`discover`] - Recursive record discovery
//! - [`batch`] - Multi-directory runs and their report
//! - [`workflow`] - Per-directory operations used by the CLI
//! - [`config`] - Configuration loading
//! - [`error`] - Shared error types
//!
//! # Quick Start
//!
//! ```no_run
//! use camino::Utf8Path;
//! use reltag_core::{ConfigLoader, workflow};
//!
//! let config = ConfigLoader::new().load().expect("configuration");
//! let shown = workflow::show_current(Utf8Path::new("."), &config.release)
//!     .expect("current release");
//! println!("{}", shown.current);
//! ```
#![deny(unsafe_code)]

pub mod batch;

pub mod config;

pub mod discover;

pub mod error;

pub mod git;

pub mod hooks;

pub mod record;

pub mod state;

pub mod tagging;

pub mod version;

pub mod workflow;

pub use batch::{Message, Report, Severity};
pub use config::{Config, ConfigLoader, LogLevel, ReleaseConfig};
pub use error::{ConfigError, ConfigResult, ReleaseError, ReleaseResult};
pub use record::ReleaseRecord;
pub use version::{BumpLevel, VersionVector};
