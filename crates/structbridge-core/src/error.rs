//! Error types for the structbridge core library
//!
//! This module defines the error taxonomy shared by every mapping operation,
//! using thiserror for the variant definitions. Each variant maps to a stable
//! [`ErrorCode`] so callers can branch on the kind of failure without parsing
//! messages.

use crate::policy::NullHandling;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Main error type for mapping operations
#[derive(Error, Debug)]
pub enum Error {
    /// A declared field type is outside the fixed classification table
    #[error("Type mapping failed: {type_name}.{field} - {message}")]
    TypeMapping {
        type_name: String,
        field: String,
        message: String,
    },

    /// A value could not be coerced between two representations
    #[error("Conversion failed: cannot convert {from}{} to {to}{}", value_suffix(.value), path_suffix(.path))]
    Conversion {
        from: String,
        to: String,
        value: Option<String>,
        path: Option<String>,
    },

    /// Null encountered while the null-handling policy is `error`
    #[error("Null value encountered for field '{path}' of {type_name} (null handling: {policy})")]
    NullInput {
        path: String,
        type_name: String,
        policy: NullHandling,
    },

    /// Strict validation rejected a target record before reverse mapping
    #[error("Validation failed for {type_name}: {message}")]
    Validation {
        type_name: String,
        message: String,
        set_slots: usize,
        required_fields: usize,
    },

    /// Internal invariant violated during the recursive walk
    #[error("Transformation failed: {message}")]
    Transformation {
        message: String,
        context: Option<String>,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// No mapping can be derived for the requested type pair
    #[error("Unsupported operation: {message}")]
    UnsupportedOperation {
        message: String,
        feature: Option<String>,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Stable error-code tags, one per [`Error`] variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    TypeMappingError,
    ConversionError,
    NullInputError,
    ValidationError,
    TransformationError,
    UnsupportedOperation,
}

impl ErrorCode {
    /// The tag as it appears in logs and serialized reports
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::TypeMappingError => "TYPE_MAPPING_ERROR",
            ErrorCode::ConversionError => "CONVERSION_ERROR",
            ErrorCode::NullInputError => "NULL_INPUT_ERROR",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::TransformationError => "TRANSFORMATION_ERROR",
            ErrorCode::UnsupportedOperation => "UNSUPPORTED_OPERATION",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Build a conversion error between two named representations
    pub fn conversion(from: impl Into<String>, to: impl Into<String>) -> Self {
        Error::Conversion {
            from: from.into(),
            to: to.into(),
            value: None,
            path: None,
        }
    }

    /// Build a conversion error that also records the offending value
    pub fn conversion_of(
        from: impl Into<String>,
        to: impl Into<String>,
        value: impl fmt::Display,
    ) -> Self {
        Error::Conversion {
            from: from.into(),
            to: to.into(),
            value: Some(value.to_string()),
            path: None,
        }
    }

    /// Build an internal invariant error
    pub fn transformation(message: impl Into<String>) -> Self {
        Error::Transformation {
            message: message.into(),
            context: None,
            source: None,
        }
    }

    /// Build an unsupported-operation error
    pub fn unsupported(message: impl Into<String>, feature: Option<&str>) -> Self {
        Error::UnsupportedOperation {
            message: message.into(),
            feature: feature.map(str::to_string),
        }
    }

    /// Stable code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::TypeMapping { .. } => ErrorCode::TypeMappingError,
            Error::Conversion { .. } => ErrorCode::ConversionError,
            Error::NullInput { .. } => ErrorCode::NullInputError,
            Error::Validation { .. } => ErrorCode::ValidationError,
            Error::Transformation { .. } => ErrorCode::TransformationError,
            Error::UnsupportedOperation { .. } => ErrorCode::UnsupportedOperation,
        }
    }

    /// Contextual details rendered as `key=value` pairs
    pub fn details(&self) -> String {
        match self {
            Error::TypeMapping { type_name, field, .. } => {
                format!("type={}, field={}", type_name, field)
            }
            Error::Conversion { from, to, value, path } => {
                let mut details = format!("from={}, to={}", from, to);
                if let Some(value) = value {
                    details.push_str(&format!(", value={}", value));
                }
                if let Some(path) = path {
                    details.push_str(&format!(", field={}", path));
                }
                details
            }
            Error::NullInput { path, type_name, policy } => {
                format!("type={}, field={}, null_handling={}", type_name, path, policy)
            }
            Error::Validation { type_name, set_slots, required_fields, .. } => format!(
                "type={}, set_slots={}, required_fields={}",
                type_name, set_slots, required_fields
            ),
            Error::Transformation { context, .. } => {
                format!("context={}", context.as_deref().unwrap_or("none"))
            }
            Error::UnsupportedOperation { feature, .. } => {
                format!("feature={}", feature.as_deref().unwrap_or("none"))
            }
        }
    }

    /// Prefix the field path of a conversion or null-input error with `segment`
    ///
    /// Called while unwinding the recursive walk so the innermost field ends up
    /// last: `nested.value`, `tags[2]`.
    pub fn at_path(self, segment: &str) -> Self {
        match self {
            Error::Conversion { from, to, value, path } => Error::Conversion {
                from,
                to,
                value,
                path: Some(join_path(segment, path.as_deref())),
            },
            Error::NullInput { path, type_name, policy } => Error::NullInput {
                path: join_path(segment, Some(&path)),
                type_name,
                policy,
            },
            other => other,
        }
    }
}

fn join_path(segment: &str, rest: Option<&str>) -> String {
    match rest {
        None | Some("") => segment.to_string(),
        Some(rest) if rest.starts_with('[') => format!("{}{}", segment, rest),
        Some(rest) => format!("{}.{}", segment, rest),
    }
}

fn value_suffix(value: &Option<String>) -> String {
    value
        .as_ref()
        .map(|v| format!(" '{}'", v))
        .unwrap_or_default()
}

fn path_suffix(path: &Option<String>) -> String {
    path.as_ref()
        .map(|p| format!(" at '{}'", p))
        .unwrap_or_default()
}
