//! Configuration loading and discovery.
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. User config: `~/.config/reltag/config.<ext>`
//! 3. Project config: `.reltag.<ext>` or `reltag.<ext>` in the search
//!    directory or a parent, up to the directory containing `.git`
//! 4. Explicit files added with [`ConfigLoader::with_file`]
//!
//! `<ext>` is one of `toml`, `yaml`, `yml`, `json`.
//!
//! ```toml
//! log_level = "debug"
//!
//! [release]
//! file_name = ".release"
//! default_branch = "main"
//! commit_message = "release {tag}"
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use figment::Figment;
use figment::providers::{Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{ConfigError, ConfigResult};
use crate::git::DEFAULT_BRANCH;
use crate::record::DEFAULT_FILE_NAME;
use crate::tagging::DEFAULT_COMMIT_MESSAGE;

const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

const APP_NAME: &str = "reltag";

/// The upward project search stops after the directory containing this.
const BOUNDARY_MARKER: &str = ".git";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Log level when neither `-v`, `-q`, nor `RUST_LOG` is given.
    pub log_level: LogLevel,
    /// Directory for JSONL log files (platform default if unset).
    pub log_dir: Option<Utf8PathBuf>,
    /// Release record and tagging behaviour.
    pub release: ReleaseConfig,
}

/// The `[release]` section.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReleaseConfig {
    /// Name of the per-directory record file.
    pub file_name: String,
    /// Branch whose releases are shown without an `@branch` suffix.
    pub default_branch: String,
    /// Commit message for a bump. Accepts `{base_tag}`, `{release}`, and `{tag}`.
    pub commit_message: String,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            file_name: DEFAULT_FILE_NAME.to_string(),
            default_branch: DEFAULT_BRANCH.to_string(),
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
        }
    }
}

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Debug detail.
    Debug,
    /// Normal operation (default).
    #[default]
    Info,
    /// Warnings only.
    Warn,
    /// Errors only.
    Error,
}

impl LogLevel {
    /// Lowercase name, usable as an `EnvFilter` directive.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Builder that layers configuration sources.
#[derive(Debug)]
pub struct ConfigLoader {
    search_root: Option<Utf8PathBuf>,
    include_user_config: bool,
    explicit_files: Vec<Utf8PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Loader with user config enabled and a `.git` boundary.
    pub fn new() -> Self {
        Self {
            search_root: None,
            include_user_config: true,
            explicit_files: Vec::new(),
        }
    }

    /// Walk up from `path` looking for a project config.
    pub fn with_project_search<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.search_root = Some(path.as_ref().to_path_buf());
        self
    }

    /// Include or skip `~/.config/reltag/config.<ext>`.
    pub const fn with_user_config(mut self, include: bool) -> Self {
        self.include_user_config = include;
        self
    }

    /// Load `path` after every discovered source. Later files win.
    pub fn with_file<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.explicit_files.push(path.as_ref().to_path_buf());
        self
    }

    /// Every file that [`load`](Self::load) would merge, lowest precedence first.
    pub fn sources(&self) -> Vec<Utf8PathBuf> {
        let mut files = Vec::new();
        if self.include_user_config
            && let Some(user) = find_user_config()
        {
            files.push(user);
        }
        if let Some(ref root) = self.search_root
            && let Some(project) = self.find_project_config(root)
        {
            files.push(project);
        }
        files.extend(self.explicit_files.iter().cloned());
        files
    }

    /// Merge defaults and all sources into a [`Config`].
    #[instrument(skip(self), fields(search_root = ?self.search_root))]
    pub fn load(self) -> ConfigResult<Config> {
        let sources = self.sources();
        let figment = sources.iter().fold(
            Figment::new().merge(Serialized::defaults(Config::default())),
            |figment, path| {
                debug!(%path, "merging config file");
                merge_file(figment, path)
            },
        );

        let config: Config = figment
            .extract()
            .map_err(|e| ConfigError::Deserialize(Box::new(e)))?;
        info!(
            log_level = config.log_level.as_str(),
            file_name = %config.release.file_name,
            sources = sources.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    fn find_project_config(&self, start: &Utf8Path) -> Option<Utf8PathBuf> {
        for dir in start.ancestors() {
            let found = CONFIG_EXTENSIONS.iter().find_map(|ext| {
                [format!(".{APP_NAME}.{ext}"), format!("{APP_NAME}.{ext}")]
                    .into_iter()
                    .map(|name| dir.join(name))
                    .find(|candidate| candidate.is_file())
            });
            if found.is_some() {
                return found;
            }

            // the directory holding the marker is the last one searched
            if dir.join(BOUNDARY_MARKER).exists() {
                break;
            }
        }
        None
    }
}

fn find_user_config() -> Option<Utf8PathBuf> {
    let config_dir = user_config_dir()?;
    CONFIG_EXTENSIONS
        .iter()
        .map(|ext| config_dir.join(format!("config.{ext}")))
        .find(|path| path.is_file())
}

fn merge_file(figment: Figment, path: &Utf8Path) -> Figment {
    match path.extension() {
        Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path.as_str())),
        Some("json") => figment.merge(Json::file_exact(path.as_str())),
        _ => figment.merge(Toml::file_exact(path.as_str())),
    }
}

/// `~/.config/reltag/` on Linux, the platform equivalent elsewhere.
pub fn user_config_dir() -> Option<Utf8PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", APP_NAME)?;
    Utf8PathBuf::from_path_buf(dirs.config_dir().to_path_buf()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn utf8(path: std::path::PathBuf) -> Utf8PathBuf {
        Utf8PathBuf::try_from(path).unwrap()
    }

    fn load_file(name: &str, contents: &str) -> ConfigResult<Config> {
        let tmp = TempDir::new().unwrap();
        let path = utf8(tmp.path().join(name));
        fs::write(&path, contents).unwrap();
        ConfigLoader::new()
            .with_user_config(false)
            .with_file(&path)
            .load()
    }

    #[test]
    fn defaults_match_legacy_behaviour() {
        let config = Config::default();
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(config.log_dir.is_none());
        assert_eq!(config.release.file_name, ".release");
        assert_eq!(config.release.default_branch, "master");
        assert_eq!(
            config.release.commit_message,
            "bumped {base_tag} to release {release}"
        );
    }

    #[test]
    fn loads_defaults_without_files() {
        let config = ConfigLoader::new()
            .with_user_config(false)
            .load()
            .unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn toml_release_section_overrides_some_keys() {
        let config = load_file(
            "config.toml",
            r#"
log_level = "debug"

[release]
default_branch = "main"
"#,
        )
        .unwrap();

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.release.default_branch, "main");
        assert_eq!(config.release.file_name, ".release");
    }

    #[test]
    fn yaml_and_json_are_supported() {
        let yaml = load_file("config.yaml", "release:\n  file_name: RELEASE\n").unwrap();
        assert_eq!(yaml.release.file_name, "RELEASE");

        let json = load_file("config.json", r#"{"log_dir": "/tmp/reltag"}"#).unwrap();
        assert_eq!(json.log_dir.as_deref().map(Utf8Path::as_str), Some("/tmp/reltag"));
    }

    #[test]
    fn invalid_value_is_deserialize_error() {
        let err = load_file("config.toml", r#"log_level = "loud""#).unwrap_err();
        assert!(matches!(err, ConfigError::Deserialize(_)));
    }

    #[test]
    fn later_file_overrides_earlier() {
        let tmp = TempDir::new().unwrap();
        let base = utf8(tmp.path().join("base.toml"));
        let over = utf8(tmp.path().join("override.toml"));
        fs::write(&base, "log_level = \"warn\"\n").unwrap();
        fs::write(&over, "log_level = \"error\"\n").unwrap();

        let config = ConfigLoader::new()
            .with_user_config(false)
            .with_file(&base)
            .with_file(&over)
            .load()
            .unwrap();
        assert_eq!(config.log_level, LogLevel::Error);
    }

    #[test]
    fn project_config_found_from_subdirectory() {
        let tmp = TempDir::new().unwrap();
        let project = tmp.path().join("project");
        let deep = project.join("svc").join("api");
        fs::create_dir_all(&deep).unwrap();
        fs::write(
            project.join(".reltag.toml"),
            "[release]\ndefault_branch = \"trunk\"\n",
        )
        .unwrap();

        let config = ConfigLoader::new()
            .with_user_config(false)
            .with_project_search(utf8(deep))
            .load()
            .unwrap();
        assert_eq!(config.release.default_branch, "trunk");
    }

    #[test]
    fn dotfile_preferred_over_plain_name() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".reltag.toml"), "log_level = \"warn\"\n").unwrap();
        fs::write(tmp.path().join("reltag.toml"), "log_level = \"error\"\n").unwrap();

        let found = ConfigLoader::new()
            .find_project_config(&utf8(tmp.path().to_path_buf()))
            .unwrap();
        assert!(found.as_str().ends_with(".reltag.toml"));
    }

    #[test]
    fn boundary_marker_stops_search() {
        let tmp = TempDir::new().unwrap();
        let parent = tmp.path().join("parent");
        let repo = parent.join("repo");
        let work = repo.join("work");
        fs::create_dir_all(&work).unwrap();
        fs::create_dir(repo.join(".git")).unwrap();
        fs::write(parent.join(".reltag.toml"), "log_level = \"warn\"\n").unwrap();

        let config = ConfigLoader::new()
            .with_user_config(false)
            .with_project_search(utf8(work))
            .load()
            .unwrap();
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn config_beside_boundary_marker_is_found() {
        let tmp = TempDir::new().unwrap();
        let repo = tmp.path().join("repo");
        let work = repo.join("work");
        fs::create_dir_all(&work).unwrap();
        fs::create_dir(repo.join(".git")).unwrap();
        fs::write(repo.join("reltag.yaml"), "log_level: debug\n").unwrap();

        let config = ConfigLoader::new()
            .with_user_config(false)
            .with_project_search(utf8(work))
            .load()
            .unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn user_config_dir_names_app() {
        if let Some(dir) = user_config_dir() {
            assert!(dir.as_str().contains("reltag"));
        }
    }
}
