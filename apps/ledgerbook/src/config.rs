//! # Configuration
//!
//! Settings resolved from four layers, later layers winning:
//!
//! 1. built-in defaults
//! 2. the TOML file (`--config <path>`, or `ledgerbook.toml` in the working
//!    directory when present)
//! 3. environment: `LEDGERBOOK_DATABASE`, `LEDGERBOOK_BACKEND`,
//!    `LEDGERBOOK_LOG_FORMAT`
//! 4. command-line flags
//!
//! ```toml
//! database = "data/ledger.redb"
//! backend = "redb"
//! rich_query = true
//! log_format = "json"
//! ```

use crate::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "ledgerbook.toml";

/// Database path used when nothing else is configured.
pub const DEFAULT_DATABASE: &str = "ledgerbook.redb";

pub const ENV_DATABASE: &str = "LEDGERBOOK_DATABASE";
pub const ENV_BACKEND: &str = "LEDGERBOOK_BACKEND";
pub const ENV_LOG_FORMAT: &str = "LEDGERBOOK_LOG_FORMAT";

// =============================================================================
// SETTINGS
// =============================================================================

/// Storage backend selection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// ACID database file on disk.
    #[default]
    Redb,
    /// Volatile; everything is lost when the command exits.
    Memory,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Redb => "redb",
            Self::Memory => "memory",
        })
    }
}

impl FromStr for BackendKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redb" => Ok(Self::Redb),
            "memory" => Ok(Self::Memory),
            other => Err(AppError::ConfigError(format!(
                "unknown backend {other:?} (expected \"redb\" or \"memory\")"
            ))),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(AppError::ConfigError(format!(
                "unknown log format {other:?} (expected \"text\" or \"json\")"
            ))),
        }
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// Path of the redb database file.
    pub database: PathBuf,
    /// Which backend to open.
    pub backend: BackendKind,
    /// Whether `GetEntityByQuery` is served; off makes the store behave like
    /// a plain key/value state database.
    pub rich_query: bool,
    pub log_format: LogFormat,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            backend: BackendKind::default(),
            rich_query: true,
            log_format: LogFormat::default(),
        }
    }
}

// =============================================================================
// LOADING
// =============================================================================

impl LedgerConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, AppError> {
        toml::from_str(source).map_err(|e| AppError::ConfigError(e.to_string()))
    }

    /// Read the config file, if any.
    ///
    /// An explicit path must exist. Without one, `ledgerbook.toml` in the
    /// working directory is used when present, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.is_file() {
                    return Ok(Self::default());
                }
                fallback
            }
        };

        let source = std::fs::read_to_string(&path).map_err(|e| {
            AppError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!(path = %path.display(), "configuration file loaded");
        Ok(config)
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), AppError> {
        if let Some(database) = lookup(ENV_DATABASE).filter(|v| !v.is_empty()) {
            self.database = PathBuf::from(database);
        }
        if let Some(backend) = lookup(ENV_BACKEND).filter(|v| !v.is_empty()) {
            self.backend = backend.parse()?;
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT).filter(|v| !v.is_empty()) {
            self.log_format = format.parse()?;
        }
        Ok(())
    }

    /// Apply command-line flags; `None` leaves the current value.
    pub fn apply_flags(&mut self, database: Option<PathBuf>, backend: Option<BackendKind>) {
        if let Some(database) = database {
            self.database = database;
        }
        if let Some(backend) = backend {
            self.backend = backend;
        }
    }

    /// Resolve every layer for this process.
    pub fn resolve(
        config_path: Option<&Path>,
        database: Option<PathBuf>,
        backend: Option<BackendKind>,
    ) -> Result<Self, AppError> {
        let mut config = Self::load(config_path)?;
        config.apply_env(|name| std::env::var(name).ok())?;
        config.apply_flags(database, backend);
        Ok(config)
    }
}

// =============================================================================
// TESTS
// =============================================================================
