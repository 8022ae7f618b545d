//! Application configuration data. Loading, merging, and validating this
//! structure is the concern of [`crate::infrastructure::config::loader::ConfigLoader`];
//! this module only defines the shape and its defaults, mirroring the
//! split the teacher uses between `domain::models::config::Config` and
//! `infrastructure::config::loader::ConfigLoader`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration for the task execution core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AppConfig {
    /// Short name used to namespace snapshot filenames, e.g. `"myapp"`.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Snapshot store configuration.
    #[serde(default)]
    pub snapshot: SnapshotConfig,

    /// Dispatcher channel and concurrency configuration.
    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_app_name() -> String {
    "app".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            snapshot: SnapshotConfig::default(),
            dispatcher: DispatcherConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Snapshot store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SnapshotConfig {
    /// Base directory snapshot files are written under.
    #[serde(default = "default_snapshot_dir")]
    pub base_dir: String,
}

fn default_snapshot_dir() -> String {
    "./data".to_string()
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            base_dir: default_snapshot_dir(),
        }
    }
}

/// Dispatcher channel-capacity configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DispatcherConfig {
    /// Bounded capacity of the submit/cancel inbox channels.
    #[serde(default = "default_inbox_capacity")]
    pub inbox_capacity: usize,
}

const fn default_inbox_capacity() -> usize {
    10
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            inbox_capacity: default_inbox_capacity(),
        }
    }
}

/// Logging configuration, consumed by [`crate::infrastructure::logging::logger::LoggerImpl`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty.
    #[serde(default)]
    pub format: LogFormat,

    /// Directory for rotating log files. Stdout-only when unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Whether to also emit to stdout when `log_dir` is set.
    #[serde(default = "default_true")]
    pub enable_stdout: bool,

    /// Log rotation policy, used only when `log_dir` is set.
    #[serde(default)]
    pub rotation: RotationPolicy,
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_dir: None,
            enable_stdout: true,
            rotation: RotationPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

impl Default for LogFormat {
    fn default() -> Self {
        Self::Pretty
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    Daily,
    Hourly,
    Never,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self::Daily
    }
}
