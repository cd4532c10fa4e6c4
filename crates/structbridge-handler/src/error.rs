//! Error types for the data handler
//!
//! Mapping failures from the core pass through unchanged in
//! [`HandlerError::Core`]; the remaining variants cover payload codecs, I/O
//! and configuration.

use crate::config::Protocol;
use std::io;

/// Result type alias for handler operations
pub type Result<T> = std::result::Result<T, HandlerError>;

/// Main error type for handler operations
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// Error from structbridge-core
    #[error("Core error: {0}")]
    Core(#[from] structbridge_core::Error),

    /// Reading the payload failed
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Payload could not be parsed into an intermediate tree
    #[error("Failed to decode {protocol} payload: {source}")]
    Deserialization {
        protocol: Protocol,
        #[source]
        source: serde_json::Error,
    },

    /// Intermediate tree could not be written as a payload
    #[error("Failed to encode {protocol} payload: {source}")]
    Serialization {
        protocol: Protocol,
        #[source]
        source: serde_json::Error,
    },

    /// Invalid handler configuration
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl HandlerError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Stable error-code tag
    pub fn code(&self) -> &'static str {
        match self {
            Self::Core(err) => err.code().as_str(),
            Self::Io(_) => "IO_ERROR",
            Self::Deserialization { .. } => "DESERIALIZATION_ERROR",
            Self::Serialization { .. } => "SERIALIZATION_ERROR",
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_codes_pass_through() {
        let err: HandlerError = structbridge_core::Error::conversion("Str", "Int32").into();
        assert_eq!(err.code(), "CONVERSION_ERROR");
        assert!(err.to_string().starts_with("Core error: Conversion failed"));
    }

    #[test]
    fn test_handler_codes() {
        assert_eq!(HandlerError::config("bad").code(), "CONFIGURATION_ERROR");

        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = HandlerError::Deserialization {
            protocol: Protocol::Json,
            source,
        };
        assert_eq!(err.code(), "DESERIALIZATION_ERROR");
        assert!(err.to_string().contains("json"));
    }
}
