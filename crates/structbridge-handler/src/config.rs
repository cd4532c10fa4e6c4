//! Handler configuration
//!
//! Settings arrive as a binding context: a flat map from dotted key names to
//! JSON values. Recognised keys configure the payload protocol, the mapping
//! policy, logging and input buffering; anything else is kept as a custom
//! property. Unrecognised enumeration names fall back to their defaults.
//!
//! Copyright (c) 2025 Structbridge Team
//! Licensed under the Apache-2.0 license

use crate::error::{HandlerError, Result};
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use structbridge_core::{CollectionPreference, MappingPolicy, NullHandling};

pub const PROTOCOL: &str = "protocol";
pub const NULL_HANDLING_STRATEGY: &str = "null.handling.strategy";
pub const COLLECTION_TYPE_PREFERENCES: &str = "collection.type.preferences";
pub const STRICT_VALIDATION_ENABLED: &str = "strict.validation.enabled";
pub const DEBUG_LOGGING_ENABLED: &str = "debug.logging.enabled";
pub const BUFFER_SIZE: &str = "buffer.size";
pub const CHARACTER_ENCODING: &str = "character.encoding";

const KNOWN_KEYS: [&str; 7] = [
    PROTOCOL,
    NULL_HANDLING_STRATEGY,
    COLLECTION_TYPE_PREFERENCES,
    STRICT_VALIDATION_ENABLED,
    DEBUG_LOGGING_ENABLED,
    BUFFER_SIZE,
    CHARACTER_ENCODING,
];

/// Smallest accepted input buffer
pub const MIN_BUFFER_SIZE: usize = 1024;
pub const DEFAULT_BUFFER_SIZE: usize = 8192;
pub const DEFAULT_CHARACTER_ENCODING: &str = "UTF-8";

/// Payload wire protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// Compact JSON
    SimpleJson,
    Binary,
    Compact,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Json => "json",
            Protocol::SimpleJson => "simple_json",
            Protocol::Binary => "binary",
            Protocol::Compact => "compact",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = HandlerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "json" => Ok(Protocol::Json),
            "simple_json" | "simplejson" => Ok(Protocol::SimpleJson),
            "binary" => Ok(Protocol::Binary),
            "compact" => Ok(Protocol::Compact),
            other => Err(HandlerError::config(format!("Unknown protocol '{}'", other))),
        }
    }
}

/// Effective handler settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    pub protocol: Protocol,
    pub policy: MappingPolicy,
    pub debug_logging: bool,
    pub buffer_size: usize,
    pub character_encoding: String,
    /// Binding-context entries with no built-in meaning
    pub custom_properties: HashMap<String, Value>,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::default(),
            policy: MappingPolicy::default(),
            debug_logging: false,
            buffer_size: DEFAULT_BUFFER_SIZE,
            character_encoding: DEFAULT_CHARACTER_ENCODING.to_string(),
            custom_properties: HashMap::new(),
        }
    }
}

impl HandlerConfig {
    /// Build settings from a binding context
    ///
    /// Values of the wrong JSON type are ignored with a warning and the
    /// default is kept.
    pub fn from_binding_context(context: &HashMap<String, Value>) -> Self {
        let mut config = Self::default();

        if let Some(name) = string_entry(context, PROTOCOL) {
            config.protocol = parse_or_default(PROTOCOL, name);
        }
        if let Some(name) = string_entry(context, NULL_HANDLING_STRATEGY) {
            config.policy.null_handling = parse_or_default::<NullHandling>(NULL_HANDLING_STRATEGY, name);
        }
        if let Some(name) = string_entry(context, COLLECTION_TYPE_PREFERENCES) {
            config.policy.collection_preference =
                parse_or_default::<CollectionPreference>(COLLECTION_TYPE_PREFERENCES, name);
        }
        if let Some(strict) = bool_entry(context, STRICT_VALIDATION_ENABLED) {
            config.policy.strict_validation = strict;
        }
        if let Some(debug) = bool_entry(context, DEBUG_LOGGING_ENABLED) {
            config.debug_logging = debug;
        }
        match context.get(BUFFER_SIZE) {
            Some(Value::Number(n)) => match n.as_u64() {
                Some(size) => config = config.with_buffer_size(size as usize),
                None => tracing::warn!(key = BUFFER_SIZE, value = %n, "Ignoring non-integral buffer size"),
            },
            Some(other) => {
                tracing::warn!(key = BUFFER_SIZE, value = %other, "Ignoring non-numeric buffer size")
            }
            None => {}
        }
        if let Some(encoding) = string_entry(context, CHARACTER_ENCODING) {
            config.character_encoding = encoding.to_string();
        }

        config.custom_properties = context
            .iter()
            .filter(|(key, _)| !KNOWN_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        config
    }

    /// Render the effective settings back into binding-context form
    pub fn to_binding_context(&self) -> HashMap<String, Value> {
        let mut context = self.custom_properties.clone();
        context.insert(PROTOCOL.to_string(), Value::from(self.protocol.as_str()));
        context.insert(
            NULL_HANDLING_STRATEGY.to_string(),
            Value::from(self.policy.null_handling.as_str()),
        );
        context.insert(
            COLLECTION_TYPE_PREFERENCES.to_string(),
            Value::from(self.policy.collection_preference.as_str()),
        );
        context.insert(
            STRICT_VALIDATION_ENABLED.to_string(),
            Value::from(self.policy.strict_validation),
        );
        context.insert(DEBUG_LOGGING_ENABLED.to_string(), Value::from(self.debug_logging));
        context.insert(BUFFER_SIZE.to_string(), Value::from(self.buffer_size));
        context.insert(
            CHARACTER_ENCODING.to_string(),
            Value::from(self.character_encoding.clone()),
        );
        context
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_policy(mut self, policy: MappingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the input buffer size, clamped to [`MIN_BUFFER_SIZE`]
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(MIN_BUFFER_SIZE);
        self
    }

    pub fn with_debug_logging(mut self, enabled: bool) -> Self {
        self.debug_logging = enabled;
        self
    }

    pub fn custom_property(&self, key: &str) -> Option<&Value> {
        self.custom_properties.get(key)
    }

    /// Check settings that cannot be corrected silently
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size < MIN_BUFFER_SIZE {
            return Err(HandlerError::config(format!(
                "buffer size must be at least {}, got {}",
                MIN_BUFFER_SIZE, self.buffer_size
            )));
        }

        let encoding = self.character_encoding.trim();
        if encoding.is_empty() {
            return Err(HandlerError::config("character encoding cannot be empty"));
        }
        if !is_utf8_label(encoding) {
            return Err(HandlerError::config(format!(
                "unsupported character encoding '{}'; payloads must be UTF-8",
                encoding
            )));
        }

        Ok(())
    }

    /// Logging settings implied by this configuration
    pub fn logging_config(&self) -> LoggingConfig {
        if self.debug_logging {
            LoggingConfig::debug()
        } else {
            LoggingConfig::default()
        }
    }
}

fn is_utf8_label(encoding: &str) -> bool {
    encoding.eq_ignore_ascii_case("utf-8") || encoding.eq_ignore_ascii_case("utf8")
}

fn string_entry<'c>(context: &'c HashMap<String, Value>, key: &str) -> Option<&'c str> {
    match context.get(key)? {
        Value::String(s) => Some(s),
        other => {
            tracing::warn!(key, value = %other, "Ignoring non-string setting");
            None
        }
    }
}

fn bool_entry(context: &HashMap<String, Value>, key: &str) -> Option<bool> {
    match context.get(key)? {
        Value::Bool(b) => Some(*b),
        other => {
            tracing::warn!(key, value = %other, "Ignoring non-boolean setting");
            None
        }
    }
}

/// Lenient enumeration parse: unknown names fall back to the default
fn parse_or_default<T>(key: &str, name: &str) -> T
where
    T: FromStr + Default + fmt::Display,
    T::Err: fmt::Display,
{
    name.parse().unwrap_or_else(|err| {
        let fallback = T::default();
        tracing::warn!(key, %err, %fallback, "Unknown setting value; using default");
        fallback
    })
}
