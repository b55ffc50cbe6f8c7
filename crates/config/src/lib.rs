//! Run configuration.
//!
//! [`Config`] is assembled once at startup from (lowest to highest priority)
//! built-in defaults, an optional config file, `JPGX_*` environment
//! variables and whatever the caller merges on top (normally command-line
//! flags). [`Config::validate`] then produces the immutable [`Settings`]
//! that the rest of the run reads from.

pub mod error;
mod settings;

use crate::error::{ErrorKind, Result};
pub use crate::settings::Settings;
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use jpgx_decode::Backend;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "JPGX_";
pub const DEFAULT_CONFIG_FILE: &str = "jpgx.toml";
pub const DEFAULT_NUM_ROUTINES: usize = 2;
/// Upper bound on the concurrency budget.
pub const MAX_NUM_ROUTINES: usize = 4096;
pub const DEFAULT_QUALITY: u8 = 80;
/// ImageMagick's `convert`.
pub const DEFAULT_ROTATE_BIN: &str = "convert";
pub const DEFAULT_ROTATE_TIMEOUT_SECS: u64 = 300;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// RAW extensions to process, e.g. `["NEF", "CR2"]` or `"NEF,CR2"`.
    #[serde(deserialize_with = "comma_list")]
    pub raws: Vec<String>,
    /// Directories to look for RAW files in (not recursive).
    #[serde(deserialize_with = "comma_list")]
    pub src_dirs: Vec<String>,
    pub dest_dir: Option<PathBuf>,
    /// Maximum number of files decoded at the same time.
    pub num_routines: usize,
    pub quality: u8,
    /// Rotate extracted JPEGs according to the RAW file's orientation.
    pub rotate: bool,
    pub rotate_bin: String,
    /// Seconds a single rotation may take, and how long the end of the run
    /// waits for outstanding rotations.
    pub rotate_timeout: u64,
    pub backend: Backend,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            raws: Vec::new(),
            src_dirs: Vec::new(),
            dest_dir: None,
            num_routines: DEFAULT_NUM_ROUTINES,
            quality: DEFAULT_QUALITY,
            rotate: false,
            rotate_bin: DEFAULT_ROTATE_BIN.to_string(),
            rotate_timeout: DEFAULT_ROTATE_TIMEOUT_SECS,
            backend: Backend::default(),
        }
    }
}

impl Config {
    /// Loads configuration, merging `overrides` last.
    ///
    /// When `file` is `None`, `jpgx.toml` in the platform configuration
    /// directory is used if it exists.
    pub fn load(file: Option<&Path>, overrides: impl figment::Provider) -> Result<Self> {
        Self::figment(file)?.merge(overrides).extract().or_raise(|| ErrorKind::Load)
    }

    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        match file {
            Some(path) => figment = merge_file(figment, path)?,
            None => {
                if let Some(path) = default_config_file()
                    && path.is_file()
                {
                    tracing::debug!(path = %path.display(), "Using default configuration file");
                    figment = figment.merge(Toml::file(path));
                }
            },
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX)))
    }
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    if !path.is_file() {
        exn::bail!(ErrorKind::Load);
    }
    let extension = path.extension().and_then(|e| e.to_str()).map(str::to_lowercase);
    Ok(match extension.as_deref() {
        Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
        Some("json") => figment.merge(Json::file(path)),
        _ => figment.merge(Toml::file(path)),
    })
}

#[must_use]
pub fn default_config_file() -> Option<PathBuf> {
    ProjectDirs::from("", "", "jpgx").map(|dirs| dirs.config_dir().join(DEFAULT_CONFIG_FILE))
}

/// Accepts either a sequence of strings or one comma-separated string.
fn comma_list<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum List {
        Joined(String),
        Items(Vec<String>),
    }
    let items = match List::deserialize(deserializer)? {
        List::Joined(s) => s.split(',').map(str::to_string).collect(),
        List::Items(items) => items,
    };
    Ok(items.into_iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
}
