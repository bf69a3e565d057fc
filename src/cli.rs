//! Command-line interface parsing
//!
//! Flags override values from the optional `--config` JSON file.

use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::{Config, ConfigError};

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded or is invalid
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Poll a rate-limited vehicle API through TTL caches
#[derive(Parser, Debug)]
#[command(name = "vehcache")]
#[command(about = "Poll vehicle telemetry through TTL caches with global reset")]
#[command(version)]
pub struct Cli {
    /// JSON configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Cache duration in seconds (0 disables caching)
    #[arg(long, value_name = "SECS")]
    pub cache: Option<u64>,

    /// Delay between polls in milliseconds
    #[arg(long, value_name = "MS")]
    pub interval: Option<u64>,

    /// Number of polls before exiting
    #[arg(long, value_name = "N")]
    pub polls: Option<u32>,

    /// Publish a global cache reset after every N polls
    #[arg(long, value_name = "N")]
    pub reset_every: Option<u32>,

    /// Make the simulated vehicle fail every N-th call
    #[arg(long, value_name = "N")]
    pub fail_every: Option<u64>,

    /// Also read this untyped vehicle endpoint through a cache and print it
    /// after the last poll
    #[arg(long, value_name = "PATH")]
    pub endpoint: Option<String>,

    /// Print readings as JSON lines
    #[arg(long)]
    pub json: bool,
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone, Default)]
pub struct StartupConfig {
    /// Effective configuration
    pub config: Config,
    /// Untyped endpoint to read after polling
    pub endpoint: Option<String>,
    /// Whether to print JSON lines
    pub json: bool,
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with file values and flag overrides applied
    /// * `Err(CliError)` if the file cannot be loaded or the result is invalid
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let mut config = match &cli.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(cache) = cli.cache {
            config.cache_secs = cache;
        }
        if let Some(interval) = cli.interval {
            config.poll_interval_ms = interval;
        }
        if let Some(polls) = cli.polls {
            config.polls = polls;
        }
        if let Some(reset_every) = cli.reset_every {
            config.reset_every = reset_every;
        }
        if let Some(fail_every) = cli.fail_every {
            config.vehicle.fail_every = fail_every;
        }
        config.validate()?;

        Ok(StartupConfig {
            config,
            endpoint: cli.endpoint.clone(),
            json: cli.json,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_cli_parse_no_args() {
        let cli = Cli::parse_from(["vehcache"]);
        assert!(cli.config.is_none());
        assert!(cli.cache.is_none());
        assert!(!cli.json);
    }

    #[test]
    fn test_cli_parse_all_flags() {
        let cli = Cli::parse_from([
            "vehcache",
            "--cache",
            "30",
            "--interval",
            "200",
            "--polls",
            "7",
            "--reset-every",
            "2",
            "--fail-every",
            "3",
            "--endpoint",
            "rolesrights/operations",
            "--json",
        ]);
        assert_eq!(cli.cache, Some(30));
        assert_eq!(cli.interval, Some(200));
        assert_eq!(cli.polls, Some(7));
        assert_eq!(cli.reset_every, Some(2));
        assert_eq!(cli.fail_every, Some(3));
        assert_eq!(cli.endpoint.as_deref(), Some("rolesrights/operations"));
        assert!(cli.json);
    }

    #[test]
    fn test_startup_config_defaults() {
        let cli = Cli::parse_from(["vehcache"]);
        let startup = StartupConfig::from_cli(&cli).unwrap();
        assert_eq!(startup.config, Config::default());
        assert!(startup.endpoint.is_none());
        assert!(!startup.json);
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(br#"{ "cache_secs": 10, "polls": 2 }"#)
            .expect("Failed to write config");
        let path = file.path().to_string_lossy().to_string();

        let cli = Cli::parse_from(["vehcache", "--config", &path, "--polls", "9"]);
        let startup = StartupConfig::from_cli(&cli).unwrap();

        assert_eq!(startup.config.cache_secs, 10);
        assert_eq!(startup.config.polls, 9);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let cli = Cli::parse_from(["vehcache", "--polls", "0"]);
        let err = StartupConfig::from_cli(&cli).unwrap_err();
        assert!(err.to_string().contains("polls"));
    }
}
