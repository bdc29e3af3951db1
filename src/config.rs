//! Runtime configuration.
//!
//! Settings are layered: an optional TOML file, then environment
//! variables prefixed with `STREAMWATCH_` (nested keys use `__`, e.g.
//! `STREAMWATCH_LOG__LEVEL=debug`), then command line overrides.
//!
//! ```toml
//! endpoint = "metrics.example:9090"
//! history_capacity = 30
//!
//! [log]
//! level = "info"
//! ```

use std::path::Path;

use anyhow::{bail, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::data::history::DEFAULT_HISTORY_SIZE;

fn default_endpoint() -> String {
    "127.0.0.1:9090".to_string()
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_SIZE
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Logger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// `host:port` of the metrics stream.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Samples kept per family.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            history_capacity: default_history_capacity(),
            log: LogConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Load from an optional file plus the environment.
    ///
    /// Not validated: command line overrides are applied on top first.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let config = builder
            .add_source(
                Environment::with_prefix("STREAMWATCH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            bail!("endpoint must not be empty");
        }
        if self.history_capacity < 2 {
            bail!(
                "history_capacity must be at least 2 to compute trends (got {})",
                self.history_capacity
            );
        }
        if self.log.level.parse::<tracing::Level>().is_err() {
            bail!("unknown log level: {}", self.log.level);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn toml_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = MonitorConfig::default();
        assert_eq!(config.endpoint, "127.0.0.1:9090");
        assert_eq!(config.history_capacity, 30);
        assert_eq!(config.log.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_loads_from_file() {
        let file = toml_file(
            r#"
            endpoint = "metrics.example:7000"
            history_capacity = 12

            [log]
            level = "debug"
            "#,
        );

        let config = MonitorConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.endpoint, "metrics.example:7000");
        assert_eq!(config.history_capacity, 12);
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = toml_file(r#"endpoint = "edge:9100""#);

        let config = MonitorConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.endpoint, "edge:9100");
        assert_eq!(config.history_capacity, 30);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_rejects_tiny_history() {
        let file = toml_file("history_capacity = 1");
        let config = MonitorConfig::load(Some(file.path())).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("history_capacity"));
    }

    #[test]
    fn test_override_fixes_invalid_layer() {
        let file = toml_file("history_capacity = 1");
        let mut config = MonitorConfig::load(Some(file.path())).unwrap();

        config.history_capacity = 30;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        let config = MonitorConfig {
            log: LogConfig {
                level: "chatty".to_string(),
            },
            ..MonitorConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
