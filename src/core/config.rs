//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! Configuration is deliberately small: where the local artifact cache
//! lives, which registered-root name prefixes join the provider search
//! scope when the root descriptor declares none, and whether missing
//! repository data degrades to empty instead of failing.
//!
//! # Locations
//!
//! Resolved in this order (later overrides earlier):
//! 1. Built-in defaults
//! 2. `weft.toml` at the workspace root
//! 3. The file named by `$WEFT_CONFIG`, when set
//!
//! # Example
//!
//! ```toml
//! artifact_cache = "/home/dev/.weft/cache"
//! provider_root_prefixes = ["kit", "platform"]
//! allow_missing_snapshots = true
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    Parse { path: PathBuf, message: String },
}

/// On-disk configuration file shape. All fields optional; defaults
/// apply per-field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    artifact_cache: Option<PathBuf>,
    provider_root_prefixes: Option<Vec<String>>,
    allow_missing_snapshots: Option<bool>,
}

/// Resolved configuration values.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory of the local artifact cache.
    pub artifact_cache: PathBuf,
    /// Fallback provider-root prefixes, used when the root descriptor
    /// declares no `<provider-roots>`.
    pub provider_root_prefixes: Vec<String>,
    /// Treat fetcher failures for repository-module data as empty data
    /// instead of aborting.
    pub allow_missing_snapshots: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            artifact_cache: default_cache_dir(),
            provider_root_prefixes: Vec::new(),
            allow_missing_snapshots: false,
        }
    }
}

impl Config {
    /// Load configuration for a workspace, applying precedence.
    pub fn load(workspace_dir: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Config::default();
        if let Some(dir) = workspace_dir {
            let path = dir.join("weft.toml");
            if path.exists() {
                config.apply(read_file(&path)?);
            }
        }
        if let Ok(override_path) = std::env::var("WEFT_CONFIG") {
            let path = PathBuf::from(override_path);
            config.apply(read_file(&path)?);
        }
        Ok(config)
    }

    fn apply(&mut self, file: ConfigFile) {
        if let Some(cache) = file.artifact_cache {
            self.artifact_cache = cache;
        }
        if let Some(prefixes) = file.provider_root_prefixes {
            self.provider_root_prefixes = prefixes;
        }
        if let Some(allow) = file.allow_missing_snapshots {
            self.allow_missing_snapshots = allow;
        }
    }
}

fn read_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn default_cache_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".weft")
        .join("cache")
}
