//! Runtime configuration
//!
//! Values come from an optional JSON file and are then overridden by
//! command-line flags. Every field has a default, so an empty file (or no
//! file at all) is a valid configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration as StdDuration;
use thiserror::Error;

/// Largest cache duration chrono can represent in seconds
const MAX_CACHE_SECS: u64 = (i64::MAX / 1000) as u64;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON for `Config`
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Behaviour of the simulated telemetry backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// State of charge reported on the first call, in percent
    pub initial_soc: u8,
    /// Charge gained per charger call while plugged in
    pub soc_step: u8,
    /// Fail every n-th call; 0 never fails
    pub fail_every: u64,
    /// Whether the vehicle is plugged in
    pub plugged: bool,
    /// Whether climatisation is running
    pub climatisation: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_soc: 40,
            soc_step: 5,
            fail_every: 0,
            plugged: true,
            climatisation: false,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cache duration in seconds; 0 disables caching
    pub cache_secs: u64,
    /// Delay between polls in milliseconds
    pub poll_interval_ms: u64,
    /// Number of polls before exiting
    pub polls: u32,
    /// Publish a global reset every n polls; 0 never resets
    pub reset_every: u32,
    /// Simulated backend settings
    pub vehicle: SimulationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_secs: 60,
            poll_interval_ms: 1000,
            polls: 5,
            reset_every: 0,
            vehicle: SimulationConfig::default(),
        }
    }
}

impl Config {
    /// Loads and validates configuration from a JSON file
    ///
    /// # Returns
    /// * `Ok(Config)` with defaults filled in for missing fields
    /// * `Err(ConfigError)` if the file cannot be read, parsed or validated
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the poller cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.polls == 0 {
            return Err(ConfigError::Invalid("polls must be at least 1".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ms must be at least 1".to_string(),
            ));
        }
        if self.vehicle.initial_soc > 100 {
            return Err(ConfigError::Invalid(format!(
                "initial_soc must be at most 100, got {}",
                self.vehicle.initial_soc
            )));
        }
        Ok(())
    }

    /// Cache duration as a chrono duration
    pub fn cache_ttl(&self) -> chrono::Duration {
        let secs = self.cache_secs.min(MAX_CACHE_SECS) as i64;
        chrono::Duration::seconds(secs)
    }

    /// Poll interval as a std duration
    pub fn poll_interval(&self) -> StdDuration {
        StdDuration::from_millis(self.poll_interval_ms)
    }
}
