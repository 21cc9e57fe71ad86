//! Runtime configuration for Jotter clients.
//!
//! Values come from, highest priority first: explicit overrides supplied by
//! the caller, `JOTTER_*` environment variables, the JSON config file, and
//! built-in defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable overriding the database path
pub const DB_PATH_ENV: &str = "JOTTER_DB_PATH";
/// Environment variable setting the default acting identity
pub const USER_ENV: &str = "JOTTER_USER";
/// Environment variable overriding the default log directive
pub const LOG_ENV: &str = "JOTTER_LOG";

/// Log directive used when none is configured
pub const DEFAULT_LOG_FILTER: &str = "jotter=info";

const APP_DIR: &str = "jotter";
const CONFIG_FILE: &str = "config.json";
const DB_FILE: &str = "jotter.db";

/// Errors raised while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// `SQLite` file backing the document store
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    /// Default acting identity
    #[serde(default)]
    pub user: Option<String>,
    /// Default `tracing` filter directive
    #[serde(default)]
    pub log_filter: Option<String>,
}

impl Config {
    /// Load the config file (if any) and apply the process environment
    pub fn load() -> Result<Self, ConfigError> {
        let config = match default_path() {
            Some(path) if path.exists() => Self::load_from_path(&path)?,
            _ => Self::default(),
        };
        Ok(config.with_env())
    }

    /// Parse a config file; environment variables are not applied
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config.normalize())
    }

    /// Apply `JOTTER_*` variables from the process environment
    #[must_use]
    pub fn with_env(self) -> Self {
        self.apply_env(|key| std::env::var(key).ok())
    }

    /// Apply `JOTTER_*` variables read through `lookup`
    #[must_use]
    pub fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = normalize_text_option(lookup(DB_PATH_ENV)) {
            self.db_path = Some(PathBuf::from(path));
        }
        if let Some(user) = normalize_text_option(lookup(USER_ENV)) {
            self.user = Some(user);
        }
        if let Some(filter) = normalize_text_option(lookup(LOG_ENV)) {
            self.log_filter = Some(filter);
        }
        self
    }

    /// Trim text values and drop blank ones
    #[must_use]
    pub fn normalize(self) -> Self {
        Self {
            db_path: self
                .db_path
                .filter(|path| !path.as_os_str().is_empty()),
            user: normalize_text_option(self.user),
            log_filter: normalize_text_option(self.log_filter),
        }
    }

    /// Database path: the override, else the configured path, else the
    /// platform data directory
    pub fn resolved_db_path(&self, override_path: Option<PathBuf>) -> PathBuf {
        override_path
            .or_else(|| self.db_path.clone())
            .unwrap_or_else(default_db_path)
    }

    /// Log directive to use when `RUST_LOG` does not say otherwise
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}

/// Location of the config file, if the platform has a config directory
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

/// Default database location under the platform data directory
///
/// Falls back to the working directory when no data directory is known.
pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(DB_FILE)
}

/// Normalize optional text by trimming whitespace and removing empties.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
