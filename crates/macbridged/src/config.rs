//! Configuration file parsing and structures.
//!
//! macbridged uses TOML for declarative configuration. Every section has
//! defaults, so an empty file (or one with only the sections that matter)
//! is valid.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration structure
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub reconcile: ReconcileConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default)]
    pub level: LogLevel,

    /// Per-module level overrides, e.g. `"macbridged::reconcile" = "debug"`
    #[serde(default)]
    pub overrides: HashMap<String, LogLevel>,
}

impl LoggingConfig {
    /// Render the config as an env-filter directive string.
    pub fn directives(&self) -> String {
        let mut directives = vec![self.level.as_directive().to_string()];
        let mut overrides: Vec<_> = self.overrides.iter().collect();
        overrides.sort();
        for (target, level) in overrides {
            directives.push(format!("{}={}", target, level.as_directive()));
        }
        directives.join(",")
    }
}

/// HTTP API configuration
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    /// Address to listen on
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bearer token required for state writes; unset disables auth
    #[serde(default)]
    pub auth_token: Option<String>,
}

fn default_listen() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8126
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            auth_token: None,
        }
    }
}

/// Reconciliation loop configuration
#[derive(Debug, Deserialize)]
pub struct ReconcileConfig {
    /// Seconds between passes
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_interval_secs() -> u64 {
    5
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

impl ReconcileConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().to_path_buf(), e))?;

        toml::from_str(&contents).map_err(ConfigError::Parse)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.api.listen, "127.0.0.1");
        assert_eq!(config.api.port, 8126);
        assert!(config.api.auth_token.is_none());
        assert_eq!(config.reconcile.interval(), Duration::from_secs(5));
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [api]
            listen = "0.0.0.0"
            port = 9000
            auth_token = "secret"

            [reconcile]
            interval_secs = 30

            [logging]
            level = "debug"

            [logging.overrides]
            "macbridged::api" = "warn"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.api.listen, "0.0.0.0");
        assert_eq!(config.api.port, 9000);
        assert_eq!(config.api.auth_token.as_deref(), Some("secret"));
        assert_eq!(config.reconcile.interval_secs, 30);
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_parse_invalid_level() {
        let toml = r#"
            [logging]
            level = "verbose"
        "#;

        assert!(toml::from_str::<Config>(toml).is_err());
    }

    #[test]
    fn test_logging_directives() {
        let toml = r#"
            [logging]
            level = "info"

            [logging.overrides]
            "macbridged::reconcile" = "debug"
            "macbridged::api" = "warn"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        insta::assert_snapshot!(
            config.logging.directives(),
            @"info,macbridged::api=warn,macbridged::reconcile=debug"
        );
    }

    #[test]
    fn test_from_file() {
        use std::fs;

        use tempfile::TempDir;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("macbridged.toml");
        fs::write(
            &path,
            r#"
            [reconcile]
            interval_secs = 1
            "#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.reconcile.interval(), Duration::from_secs(1));

        let missing = Config::from_file(temp_dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(ConfigError::Io(_, _))));
    }
}
