use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::AppConfig;

/// Configuration error types.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("app_name must not be empty")]
    EmptyAppName,

    #[error("snapshot.base_dir must not be empty")]
    EmptyBaseDir,

    #[error("dispatcher.inbox_capacity must be at least 1")]
    InvalidInboxCapacity,

    #[error("logging level {0:?} must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),
}

/// Configuration loader with hierarchical merging, mirroring the
/// teacher's `ConfigLoader`: defaults, then project config, then a
/// project-local override, then environment variables (highest
/// precedence).
pub struct ConfigLoader;

impl ConfigLoader {
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults
    /// 2. `.taskwarden/config.yaml` (project config)
    /// 3. `.taskwarden/local.yaml` (optional dev/test overrides)
    /// 4. Environment variables (`TASKWARDEN_` prefix)
    pub fn load() -> Result<AppConfig> {
        let config: AppConfig = Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Yaml::file(".taskwarden/config.yaml"))
            .merge(Yaml::file(".taskwarden/local.yaml"))
            .merge(Env::prefixed("TASKWARDEN_").split("__"))
            .extract()
            .context("failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from an explicit file, used by tests and
    /// by callers that don't want the project-relative default paths.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<AppConfig> {
        let config: AppConfig = Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    pub fn validate(config: &AppConfig) -> Result<(), ConfigError> {
        if config.app_name.trim().is_empty() {
            return Err(ConfigError::EmptyAppName);
        }

        if config.snapshot.base_dir.trim().is_empty() {
            return Err(ConfigError::EmptyBaseDir);
        }

        if config.dispatcher.inbox_capacity == 0 {
            return Err(ConfigError::InvalidInboxCapacity);
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        Ok(())
    }
}
