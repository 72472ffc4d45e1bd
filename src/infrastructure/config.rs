//! Configuration loading.
//!
//! Hierarchical configuration using figment: programmatic defaults, a
//! project `quorum.yaml`, then `QUORUM_*` environment overrides.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid perspective_count: {0}. Must be between 1 and 10")]
    InvalidPerspectiveCount(usize),

    #[error("Invalid artifact_word_target: {0}. Must be positive")]
    InvalidWordTarget(usize),

    #[error("Invalid timeout_secs: {0}. Must be positive")]
    InvalidTimeout(u64),

    #[error("Gateway base_url cannot be empty")]
    EmptyBaseUrl,

    #[error("Gateway api_key_env cannot be empty")]
    EmptyApiKeyEnv,

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults
    /// 2. ./quorum.yaml
    /// 3. Environment variables (`QUORUM_*` prefix, `__` section separator)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file("quorum.yaml"))
            .merge(Env::prefixed("QUORUM_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("QUORUM_").split("__"))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.engine.perspective_count == 0 || config.engine.perspective_count > 10 {
            return Err(ConfigError::InvalidPerspectiveCount(
                config.engine.perspective_count,
            ));
        }
        if config.engine.artifact_word_target == 0 {
            return Err(ConfigError::InvalidWordTarget(
                config.engine.artifact_word_target,
            ));
        }
        if config.gateway.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout(config.gateway.timeout_secs));
        }
        if config.gateway.base_url.trim().is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        if config.gateway.api_key_env.trim().is_empty() {
            return Err(ConfigError::EmptyApiKeyEnv);
        }
        match config.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => return Err(ConfigError::InvalidLogLevel(other.to_string())),
        }
        match config.logging.format.as_str() {
            "json" | "pretty" => {}
            other => return Err(ConfigError::InvalidLogFormat(other.to_string())),
        }
        Ok(())
    }
}
