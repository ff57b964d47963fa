//! Configuration loading and validation.
//!
//! Settings are layered with [`figment`], lowest precedence first:
//!
//! 1. Built-in defaults.
//! 2. A config file: either given explicitly, or `config.toml` in the
//!    platform config directory (see [`default_config_file`]). TOML, YAML
//!    and JSON are accepted, chosen by file extension.
//! 3. Environment variables ([`ENV_KEYS`]).
//! 4. Overrides, usually built from command-line flags.
//!
//! The merged [`Config`] is then validated into [`Settings`], which is the
//! only form the rest of the application sees.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Environment variables read by the [`Env`] layer. Each maps to the
/// lower-cased [`Config`] key of the same name.
pub const ENV_KEYS: [&str; 8] = [
    "SUBMISSION_SHEET_ID",
    "WORKSHEET_NAME",
    "SUBMISSIONS_FOLDER_ID",
    "DEST_ROOT_FOLDER_ID",
    "LOG_LEVEL",
    "DRY_RUN",
    "SUBMISSION_LEDGER",
    "PROCESSED_ORIGINALS_FOLDER",
];

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// One layer of raw, unvalidated configuration.
///
/// Every field is optional so that the same type can describe a config
/// file, the environment, or command-line overrides; unset fields never
/// shadow lower layers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// CSV file, or a workbook directory of `<tab>.csv` files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_sheet_id: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worksheet_name: Option<String>,
    /// Root of the pool that submitted audio files are uploaded into.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submissions_folder_id: Option<PathBuf>,
    /// Root that division folders are created under. Defaults to the
    /// submissions pool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest_root_folder_id: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_ledger: Option<bool>,
    /// Folder, relative to the submissions pool, that originals are moved
    /// into when they cannot be deleted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_originals_folder: Option<PathBuf>,
}

/// Where renamed files are filed.
///
/// Resolved exactly once, when [`Config`] is validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationRoot {
    /// A dedicated destination root, separate from the submissions pool.
    Dedicated(PathBuf),
    /// Division folders are created inside the submissions pool itself.
    SourcePool,
}

/// Validated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub sheet: PathBuf,
    pub worksheet: Option<String>,
    pub source_root: PathBuf,
    pub destination: DestinationRoot,
    pub log_level: String,
    pub dry_run: bool,
    pub submission_ledger: bool,
    /// `None` keeps the pipeline's default folder.
    pub processed_originals: Option<PathBuf>,
}

/// `config.toml` inside the platform-specific config directory, e.g.
/// `~/.config/routine-music/config.toml` on Linux.
pub fn default_config_file() -> Option<PathBuf> {
    ProjectDirs::from("", "", "routine-music").map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Builds the layered [`Figment`] and extracts a [`Config`] from it.
#[derive(Debug, Default)]
pub struct Loader {
    file: Option<PathBuf>,
    overrides: Config,
}
impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `path` as the config file instead of searching the platform
    /// config directory. Unlike the default file, it must exist.
    pub fn file(mut self, path: Option<PathBuf>) -> Self {
        self.file = path;
        self
    }

    /// Highest-precedence layer.
    pub fn overrides(mut self, overrides: Config) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn figment(&self) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        let file = match &self.file {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::InvalidPath {
                key: "config",
                path: path.clone()
            }),
            Some(path) => Some(path.clone()),
            None => default_config_file().filter(|path| path.is_file()),
        };
        if let Some(path) = file {
            tracing::debug!(path = %path.display(), "Loading configuration file");
            figment = merge_file(figment, &path)?;
        }

        Ok(figment
            .merge(Env::raw().only(&ENV_KEYS))
            .merge(Serialized::defaults(self.overrides.clone())))
    }

    pub fn load(&self) -> Result<Config> {
        self.figment()?.extract().or_raise(|| ErrorKind::Load)
    }
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    Ok(match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
        Some("json") => figment.merge(Json::file(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
    })
}

/// Empty strings (e.g. `DEST_ROOT_FOLDER_ID=`) count as unset.
fn non_empty(path: Option<PathBuf>) -> Option<PathBuf> {
    path.filter(|p| !p.as_os_str().is_empty())
}

fn absolute(key: &'static str, path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).or_raise(|| ErrorKind::InvalidPath {
        key,
        path: path.to_path_buf(),
    })
}

impl Config {
    /// Check required keys and paths, apply defaults, and resolve the
    /// destination root.
    pub fn validate(self) -> Result<Settings> {
        let sheet = non_empty(self.submission_sheet_id).ok_or_raise(|| ErrorKind::Missing("submission_sheet_id"))?;
        let sheet = absolute("submission_sheet_id", &sheet)?;
        if !sheet.exists() {
            exn::bail!(ErrorKind::InvalidPath {
                key: "submission_sheet_id",
                path: sheet
            });
        }

        let source_root =
            non_empty(self.submissions_folder_id).ok_or_raise(|| ErrorKind::Missing("submissions_folder_id"))?;
        let source_root = absolute("submissions_folder_id", &source_root)?;
        if !source_root.is_dir() {
            exn::bail!(ErrorKind::InvalidPath {
                key: "submissions_folder_id",
                path: source_root
            });
        }

        let destination = match non_empty(self.dest_root_folder_id) {
            None => DestinationRoot::SourcePool,
            Some(path) => {
                let path = absolute("dest_root_folder_id", &path)?;
                if path.exists() && !path.is_dir() {
                    exn::bail!(ErrorKind::InvalidPath {
                        key: "dest_root_folder_id",
                        path
                    });
                }
                if path == source_root {
                    DestinationRoot::SourcePool
                } else {
                    DestinationRoot::Dedicated(path)
                }
            },
        };

        let processed_originals = match non_empty(self.processed_originals_folder) {
            Some(folder) if !folder.components().all(|c| matches!(c, Component::Normal(_))) => {
                exn::bail!(ErrorKind::InvalidPath {
                    key: "processed_originals_folder",
                    path: folder
                })
            },
            folder => folder,
        };

        Ok(Settings {
            sheet,
            worksheet: self.worksheet_name.filter(|w| !w.trim().is_empty()),
            source_root,
            destination,
            log_level: self
                .log_level
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            dry_run: self.dry_run.unwrap_or(false),
            submission_ledger: self.submission_ledger.unwrap_or(true),
            processed_originals,
        })
    }
}
