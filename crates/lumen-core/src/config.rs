//! Persisted config (index location, chunking and search tuning) in the app data directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::app_data;
use crate::chunks::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::documents::{DEFAULT_IGNORED_DIRS, DEFAULT_MAX_DEPTH, DEFAULT_MAX_FILE_SIZE};
use crate::search::{DEFAULT_MIN_SCORE, DEFAULT_TOP_K};

const CONFIG_FILENAME: &str = "config.toml";
const INDEX_DIRNAME: &str = "index";

/// Shortest trimmed text worth indexing, in characters.
pub const DEFAULT_MIN_TEXT_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the index snapshot lives. Defaults to `<app data>/index`.
    pub index_dir: Option<String>,
    /// Words per chunk.
    pub chunk_size: usize,
    /// Words shared by consecutive chunks.
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub min_score: f64,
    pub min_text_len: usize,
    /// Bytes.
    pub max_file_size: u64,
    pub max_depth: usize,
    pub ignored_dirs: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            index_dir: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            top_k: DEFAULT_TOP_K,
            min_score: DEFAULT_MIN_SCORE,
            min_text_len: DEFAULT_MIN_TEXT_LEN,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_depth: DEFAULT_MAX_DEPTH,
            ignored_dirs: DEFAULT_IGNORED_DIRS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Load config from the app data directory. Returns default config if missing or invalid.
pub fn load_config() -> Config {
    let Some(data_dir) = app_data::app_data_dir() else {
        return Config::default();
    };
    load_config_from(&data_dir.join(CONFIG_FILENAME))
}

/// Load config from an explicit file. Returns default config if missing or invalid.
pub fn load_config_from(path: &Path) -> Config {
    let Ok(s) = std::fs::read_to_string(path) else {
        return Config::default();
    };
    match toml::from_str(&s) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "invalid config; using defaults");
            Config::default()
        }
    }
}

/// Save config to the app data directory.
pub fn save_config(config: &Config) -> Result<(), ConfigError> {
    let data_dir = app_data::app_data_dir().ok_or(ConfigError::NoDataDir)?;
    save_config_to(config, &data_dir.join(CONFIG_FILENAME))
}

pub fn save_config_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    let s = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(ConfigError::Write)?;
    }
    std::fs::write(path, s).map_err(ConfigError::Write)
}

/// Resolve the index directory: the configured one, else `<app data>/index`.
pub fn get_index_dir(config: &Config) -> Result<PathBuf, ConfigError> {
    if let Some(dir) = config.index_dir.as_deref().filter(|s| !s.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    app_data::app_data_dir()
        .map(|d| d.join(INDEX_DIRNAME))
        .ok_or(ConfigError::NoDataDir)
}

/// Set and persist the index directory. Created if it does not exist.
/// Returns the canonical path that was saved.
pub fn set_index_dir(path: &Path) -> Result<PathBuf, ConfigError> {
    let data_dir = app_data::app_data_dir().ok_or(ConfigError::NoDataDir)?;
    set_index_dir_in(&data_dir.join(CONFIG_FILENAME), path)
}

/// [`set_index_dir`] against an explicit config file; other settings in it are kept.
pub fn set_index_dir_in(config_path: &Path, path: &Path) -> Result<PathBuf, ConfigError> {
    std::fs::create_dir_all(path).map_err(ConfigError::Write)?;
    let path = path.canonicalize().map_err(ConfigError::Canonicalize)?;
    if !path.is_dir() {
        return Err(ConfigError::NotADirectory(path));
    }
    let mut config = load_config_from(config_path);
    config.index_dir = Some(path.to_string_lossy().into_owned());
    save_config_to(&config, config_path)?;
    tracing::info!(index_dir = %path.display(), "index directory set");
    Ok(path)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine app data directory")]
    NoDataDir,
    #[error("failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("failed to write config: {0}")]
    Write(std::io::Error),
    #[error("failed to resolve path: {0}")]
    Canonicalize(std::io::Error),
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
}
