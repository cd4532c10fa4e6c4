//! Mapping policy consulted by both transformers
//!
//! The policy is immutable configuration: a null-handling strategy, a
//! collection-type preference and a strict-validation flag. The numeric and
//! string coercion table is fixed and lives in [`crate::coerce`].
//!
//! Copyright (c) 2025 Structbridge Team
//! Licensed under the Apache-2.0 license

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How absent or null field values are represented after conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NullHandling {
    /// Write an explicit null marker
    #[default]
    Preserve,
    /// Write the type-appropriate zero value
    Default,
    /// Leave the slot or field untouched
    Omit,
    /// Abort the transform with a null-input error
    Error,
}

impl NullHandling {
    pub fn as_str(&self) -> &'static str {
        match self {
            NullHandling::Preserve => "preserve",
            NullHandling::Default => "default",
            NullHandling::Omit => "omit",
            NullHandling::Error => "error",
        }
    }
}

impl fmt::Display for NullHandling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NullHandling {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "preserve" => Ok(NullHandling::Preserve),
            "default" => Ok(NullHandling::Default),
            "omit" => Ok(NullHandling::Omit),
            "error" => Ok(NullHandling::Error),
            other => Err(Error::unsupported(
                format!("Unknown null handling strategy '{}'", other),
                Some("null_handling"),
            )),
        }
    }
}

/// Which target collection kind a source list field produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionPreference {
    #[default]
    List,
    Set,
    Array,
}

impl CollectionPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionPreference::List => "list",
            CollectionPreference::Set => "set",
            CollectionPreference::Array => "array",
        }
    }
}

impl fmt::Display for CollectionPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionPreference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "list" => Ok(CollectionPreference::List),
            "set" => Ok(CollectionPreference::Set),
            "array" => Ok(CollectionPreference::Array),
            other => Err(Error::unsupported(
                format!("Unknown collection type preference '{}'", other),
                Some("collection_preference"),
            )),
        }
    }
}

/// What a transformer should do with a null or missing field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullOutcome {
    /// Write an explicit null
    ExplicitNull,
    /// Write the zero value for the field's type
    ZeroValue,
    /// Leave the field untouched
    Skip,
}

/// Policy configuration shared by forward and reverse mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingPolicy {
    pub null_handling: NullHandling,
    pub collection_preference: CollectionPreference,
    pub strict_validation: bool,
}

impl Default for MappingPolicy {
    fn default() -> Self {
        Self {
            null_handling: NullHandling::Preserve,
            collection_preference: CollectionPreference::List,
            strict_validation: true,
        }
    }
}

impl MappingPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_null_handling(mut self, null_handling: NullHandling) -> Self {
        self.null_handling = null_handling;
        self
    }

    pub fn with_collection_preference(mut self, preference: CollectionPreference) -> Self {
        self.collection_preference = preference;
        self
    }

    pub fn with_strict_validation(mut self, strict: bool) -> Self {
        self.strict_validation = strict;
        self
    }

    /// Decide how to treat a null or missing `field` of `type_name`
    ///
    /// Under [`NullHandling::Error`] this is where the transform aborts.
    pub fn resolve_null(&self, type_name: &str, field: &str) -> Result<NullOutcome> {
        match self.null_handling {
            NullHandling::Preserve => Ok(NullOutcome::ExplicitNull),
            NullHandling::Default => Ok(NullOutcome::ZeroValue),
            NullHandling::Omit => Ok(NullOutcome::Skip),
            NullHandling::Error => Err(Error::NullInput {
                path: field.to_string(),
                type_name: type_name.to_string(),
                policy: self.null_handling,
            }),
        }
    }
}
