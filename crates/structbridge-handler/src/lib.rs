//! Structbridge Handler - payload entry point for the structbridge mapper
//!
//! This crate wraps a [`structbridge_core::Mapper`] with the pieces a host
//! needs to move payloads in and out of Target records.
//!
//! # Main Components
//!
//! - **Configuration**: [`HandlerConfig`] loaded from a binding context
//! - **Codecs**: [`PayloadCodec`] implementations per wire [`Protocol`]
//! - **Data Handler**: [`DataHandler`] decode, encode and transform-into
//! - **Logging**: `tracing` subscriber setup via [`init_logging`]
//!
//! # Example
//!
//! ```no_run
//! use std::collections::HashMap;
//! use structbridge_handler::{DataHandler, HandlerConfig};
//!
//! let handler = DataHandler::new(HandlerConfig::default())?;
//! assert_eq!(handler.cache_stats().schema_count, 0);
//! handler.validate_configuration()?;
//!
//! let context = HashMap::from([("protocol".to_string(), "simple_json".into())]);
//! let handler = DataHandler::from_binding_context(context)?;
//! # Ok::<(), structbridge_handler::HandlerError>(())
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod handler;
pub mod logging;

// Re-export main types for convenience
pub use codec::{codec_for, JsonCodec, PayloadCodec};
pub use config::{HandlerConfig, Protocol};
pub use error::{HandlerError, Result};
pub use handler::DataHandler;
pub use logging::{init_logging, LogFormat, LoggingConfig};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
