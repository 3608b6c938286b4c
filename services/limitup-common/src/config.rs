//! Configuration management for limitup services.
//!
//! All limitup services share a unified configuration file at
//! `~/.limitup/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Explicit config file values
//! 2. Environment variables (LIMITUP_* prefix)
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `LIMITUP_DB_PATH` → storage.db_path
//! - `LIMITUP_POOL_DIR` → storage.pool_dir
//! - `LIMITUP_LOG_LEVEL` → observability.log_level
//! - `LIMITUP_LOG_FORMAT` → observability.log_format

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".limitup")
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Storage Configuration
// ============================================================================

/// Paths for locally persisted market data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database holding daily bars, instrument
    /// metadata and valuation metrics.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Directory for per-date pool snapshot documents.
    #[serde(default = "default_pool_dir")]
    pub pool_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            pool_dir: default_pool_dir(),
        }
    }
}

fn default_db_path() -> PathBuf {
    config_dir().join("market.db")
}

fn default_pool_dir() -> PathBuf {
    config_dir().join("pool_data")
}

// ============================================================================
// Selection Configuration
// ============================================================================

/// Tunables for one selection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Maximum concurrent per-instrument evaluations.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Optional wall-clock budget for the run, in seconds. Evaluations
    /// still in flight past the budget are cancelled; finished
    /// qualifications are kept.
    #[serde(default)]
    pub time_budget_secs: Option<u64>,

    /// Maximum attempts for the live-tick auction tier.
    #[serde(default = "default_auction_max_attempts")]
    pub auction_max_attempts: u32,

    /// Fixed backoff between auction fetch attempts, in milliseconds.
    #[serde(default = "default_auction_backoff_ms")]
    pub auction_backoff_ms: u64,

    /// Instruments listed fewer than this many calendar days before the
    /// entry date are excluded from the candidate universe.
    #[serde(default = "default_min_listed_days")]
    pub min_listed_days: i64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            time_budget_secs: None,
            auction_max_attempts: default_auction_max_attempts(),
            auction_backoff_ms: default_auction_backoff_ms(),
            min_listed_days: default_min_listed_days(),
        }
    }
}

fn default_max_concurrency() -> usize {
    8
}

fn default_auction_max_attempts() -> u32 {
    3
}

fn default_auction_backoff_ms() -> u64 {
    1000
}

fn default_min_listed_days() -> i64 {
    50
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Base log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format: "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Unified configuration for limitup services.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Local storage paths
    #[serde(default)]
    pub storage: StorageConfig,

    /// Selection run tunables
    #[serde(default)]
    pub selection: SelectionConfig,

    /// Logging
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the default path, falling back to
    /// defaults when the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    /// Load configuration from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let mut config = if path.exists() {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Persist the configuration to the default path.
    pub fn save(&self) -> Result<()> {
        let path = config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(&path, raw)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Apply LIMITUP_* environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("LIMITUP_DB_PATH") {
            self.storage.db_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("LIMITUP_POOL_DIR") {
            self.storage.pool_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("LIMITUP_LOG_LEVEL") {
            self.observability.log_level = v;
        }
        if let Ok(v) = std::env::var("LIMITUP_LOG_FORMAT") {
            self.observability.log_format = v;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
