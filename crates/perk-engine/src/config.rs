//! Engine configuration module.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults suitable for a single-branch deployment.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Settlement engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path to the SQLite database file
    pub database_path: PathBuf,

    /// Whether to spawn the reward outbox worker
    pub worker_enabled: bool,

    /// Reward worker poll interval in seconds
    pub worker_poll_interval_secs: u64,

    /// Pending outbox entries fetched per worker tick
    pub worker_batch_size: i64,

    /// Capacity of the scan event broadcast channel
    pub scan_channel_capacity: usize,
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config = EngineConfig {
            database_path: env::var("PERK_DATABASE_PATH")
                .unwrap_or_else(|_| "./perk.db".to_string())
                .into(),

            worker_enabled: env::var("PERK_WORKER_ENABLED")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PERK_WORKER_ENABLED".to_string()))?,

            worker_poll_interval_secs: env::var("PERK_WORKER_POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| {
                    ConfigError::InvalidValue("PERK_WORKER_POLL_INTERVAL_SECS".to_string())
                })?,

            worker_batch_size: env::var("PERK_WORKER_BATCH_SIZE")
                .unwrap_or_else(|_| "25".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PERK_WORKER_BATCH_SIZE".to_string()))?,

            scan_channel_capacity: env::var("PERK_SCAN_CHANNEL_CAPACITY")
                .unwrap_or_else(|_| "64".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PERK_SCAN_CHANNEL_CAPACITY".to_string()))?,
        };

        if config.worker_batch_size <= 0 {
            return Err(ConfigError::InvalidValue(
                "PERK_WORKER_BATCH_SIZE".to_string(),
            ));
        }

        Ok(config)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            database_path: PathBuf::from("./perk.db"),
            worker_enabled: true,
            worker_poll_interval_secs: 5,
            worker_batch_size: 25,
            scan_channel_capacity: 64,
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(config.worker_enabled);
        assert_eq!(config.worker_poll_interval_secs, 5);
        assert_eq!(config.worker_batch_size, 25);
    }
}
