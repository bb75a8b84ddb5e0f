use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::walk::{normalize_extension, WalkOptions};

const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 100;
const DEFAULT_COVER_BATCH_SIZE: usize = 100;
const DEFAULT_COVER_THUMBNAIL_SIZE: u32 = 256;

fn default_extensions() -> Vec<String> {
    [
        "mp3", "flac", "ogg", "opus", "m4a", "mp4", "aac", "wav", "aiff", "aif", "wv", "ape",
        "mpc",
    ]
    .iter()
    .map(|ext| ext.to_string())
    .collect()
}

/// On-disk loader settings. Relative paths are resolved against the
/// directory of the config file.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub roots: Vec<String>,
    pub cache_path: String,
    pub extensions: Vec<String>,
    pub follow_links: bool,
    pub progress_interval_ms: u64,
    pub cover_batch_size: usize,
    pub cover_thumbnail_size: u32,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            cache_path: "library.cache".to_string(),
            extensions: default_extensions(),
            follow_links: false,
            progress_interval_ms: DEFAULT_PROGRESS_INTERVAL_MS,
            cover_batch_size: DEFAULT_COVER_BATCH_SIZE,
            cover_thumbnail_size: DEFAULT_COVER_THUMBNAIL_SIZE,
        }
    }
}

impl LoaderConfig {
    pub fn load_options(&self, config_path: &Path) -> LoadOptions {
        let roots = self
            .roots
            .iter()
            .map(|root| root.trim())
            .filter(|root| !root.is_empty())
            .map(|root| resolve_path(config_path, root))
            .collect();
        let cache_path = match self.cache_path.trim() {
            "" => None,
            value => Some(resolve_path(config_path, value)),
        };
        LoadOptions {
            roots,
            cache_path,
            walk: WalkOptions::new(&self.extensions, self.follow_links),
            progress_interval: Duration::from_millis(self.progress_interval_ms),
            cover_batch_size: self.cover_batch_size,
            cover_thumbnail_size: self.cover_thumbnail_size,
        }
    }

    fn normalize(&mut self) {
        self.extensions = self
            .extensions
            .iter()
            .map(|ext| normalize_extension(ext))
            .filter(|ext| !ext.is_empty())
            .collect();
        if self.cover_batch_size == 0 {
            self.cover_batch_size = DEFAULT_COVER_BATCH_SIZE;
        }
        if self.cover_thumbnail_size == 0 {
            self.cover_thumbnail_size = DEFAULT_COVER_THUMBNAIL_SIZE;
        }
    }
}

/// Resolved settings for one loader run.
#[derive(Clone, Debug)]
pub struct LoadOptions {
    pub roots: Vec<PathBuf>,
    /// `None` runs without a persisted cache.
    pub cache_path: Option<PathBuf>,
    pub walk: WalkOptions,
    pub progress_interval: Duration,
    pub cover_batch_size: usize,
    pub cover_thumbnail_size: u32,
}

impl LoadOptions {
    pub fn new<I, P>(roots: I, cache_path: Option<PathBuf>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            cache_path,
            walk: WalkOptions::default(),
            progress_interval: Duration::from_millis(DEFAULT_PROGRESS_INTERVAL_MS),
            cover_batch_size: DEFAULT_COVER_BATCH_SIZE,
            cover_thumbnail_size: DEFAULT_COVER_THUMBNAIL_SIZE,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "io error: {}", err),
            ConfigError::Yaml(err) => write!(f, "yaml error: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Yaml(err)
    }
}

pub fn config_path_from_env() -> PathBuf {
    match env::var("AUDIO_LIBRARY_CONFIG") {
        Ok(value) if !value.trim().is_empty() => PathBuf::from(value),
        _ => default_config_path(),
    }
}

fn default_config_path() -> PathBuf {
    match env::current_exe() {
        Ok(exe) => exe
            .parent()
            .map(|dir| dir.join("config.yaml"))
            .unwrap_or_else(|| PathBuf::from("config.yaml")),
        Err(_) => PathBuf::from("config.yaml"),
    }
}

/// Reads the config at `path`, writing the defaults there first if it does
/// not exist. The flag is `true` when the file was created.
pub fn load_or_create_config(path: &Path) -> Result<(LoaderConfig, bool), ConfigError> {
    if path.exists() {
        let contents = fs::read_to_string(path)?;
        let mut config: LoaderConfig = serde_yaml::from_str(&contents)?;
        config.normalize();
        return Ok((config, false));
    }

    let config = LoaderConfig::default();
    save_config(path, &config)?;
    Ok((config, true))
}

pub fn save_config(path: &Path, config: &LoaderConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let contents = serde_yaml::to_string(config)?;
    fs::write(path, contents)?;
    Ok(())
}

pub fn resolve_path(config_path: &Path, value: &str) -> PathBuf {
    let raw = PathBuf::from(value);
    if raw.is_absolute() {
        return raw;
    }
    let base = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    base.join(raw)
}
