//! Configuration file
//!
//! A single JSON object. Only `data_file` is required.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::index::{IndexConfig, UpdatePolicy, DEFAULT_CAPACITY};
use crate::observability::Severity;

use super::errors::{CliError, CliResult};

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path of the record store file (required)
    pub data_file: String,

    /// Initial bucket count of the id cache (optional, default 16)
    #[serde(default = "default_cache_initial_capacity")]
    pub cache_initial_capacity: usize,

    /// How string indexes react to record updates (optional, default "reindex")
    #[serde(default)]
    pub update_policy: UpdatePolicy,

    /// Minimum log severity (optional, default "warn")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_cache_initial_capacity() -> usize {
    DEFAULT_CAPACITY
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        Self::parse(&content)
    }

    /// Parse and validate configuration JSON
    pub fn parse(content: &str) -> CliResult<Self> {
        let config: Config = serde_json::from_str(content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.data_file.trim().is_empty() {
            return Err(CliError::config_error("data_file must not be empty"));
        }

        if self.cache_initial_capacity == 0 {
            return Err(CliError::config_error("cache_initial_capacity must be > 0"));
        }

        self.log_severity()?;

        Ok(())
    }

    /// Get data file as Path
    pub fn data_path(&self) -> &Path {
        Path::new(&self.data_file)
    }

    /// Parsed minimum log severity
    pub fn log_severity(&self) -> CliResult<Severity> {
        self.log_level
            .parse()
            .map_err(|e: String| CliError::config_error(format!("Invalid log_level: {}", e)))
    }

    /// Index settings for the catalog
    pub fn index_config(&self) -> IndexConfig {
        IndexConfig {
            initial_capacity: self.cache_initial_capacity,
            update_policy: self.update_policy,
        }
    }
}
