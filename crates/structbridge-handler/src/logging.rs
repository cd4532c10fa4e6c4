//! Logging setup for hosts embedding the data handler
//!
//! This module provides:
//! - A serializable logging configuration
//! - Subscriber installation with `RUST_LOG` taking precedence
//! - Bridging of `log` records emitted by structbridge-core

use crate::error::{HandlerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing_subscriber::EnvFilter;

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter
    pub level: String,
    /// Output format
    pub format: LogFormat,
    /// Include thread IDs
    pub thread_ids: bool,
    /// Include file and line numbers
    pub source_location: bool,
    /// Per-target level overrides
    pub module_filter: Option<HashMap<String, String>>,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Compact format for production
    Compact,
    /// Full format with all details
    Full,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            thread_ids: false,
            source_location: false,
            module_filter: None,
        }
    }
}

impl LoggingConfig {
    /// Verbose settings used when debug logging is enabled
    pub fn debug() -> Self {
        Self {
            level: "debug".to_string(),
            format: LogFormat::Full,
            source_location: true,
            ..Self::default()
        }
    }
}

/// Install the global subscriber
///
/// Fails if a global subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter = create_env_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(config.thread_ids)
        .with_file(config.source_location)
        .with_line_number(config.source_location);

    let installed = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Full => builder.try_init(),
    };
    installed.map_err(|e| HandlerError::Configuration {
        message: "Failed to initialize logging".to_string(),
        source: Some(anyhow::anyhow!(e.to_string())),
    })?;

    tracing::debug!(level = %config.level, format = ?config.format, "Logging initialized");
    Ok(())
}

/// Create the level filter; `RUST_LOG` overrides the configured level
fn create_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if let Some(module_filters) = &config.module_filter {
        for (module, level) in module_filters {
            let directive = format!("{}={}", module, level)
                .parse()
                .map_err(|e| HandlerError::Configuration {
                    message: format!("Invalid log directive for '{}'", module),
                    source: Some(anyhow::Error::new(e)),
                })?;
            filter = filter.add_directive(directive);
        }
    }

    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_config() {
        let config = LoggingConfig::debug();
        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Full);
        assert!(config.source_location);
    }

    #[test]
    fn test_invalid_module_directive() {
        let config = LoggingConfig {
            module_filter: Some(HashMap::from([(
                "structbridge_core".to_string(),
                "loud".to_string(),
            )])),
            ..LoggingConfig::default()
        };
        let err = create_env_filter(&config).unwrap_err();
        assert_eq!(err.code(), "CONFIGURATION_ERROR");
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: LoggingConfig = serde_json::from_str(r#"{"level": "warn"}"#).unwrap();
        assert_eq!(config.level, "warn");
        assert_eq!(config.format, LogFormat::Compact);
    }
}
