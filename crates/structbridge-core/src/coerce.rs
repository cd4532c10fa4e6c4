//! Fixed coercion table between pivot nodes and scalar representations
//!
//! - integer widening and narrowing uses two's-complement truncation and
//!   never fails
//! - numbers parse from and format to strings with locale-independent decimal
//!   notation; an invalid numeral for the requested width is an error
//! - booleans parse case-insensitively from "true" and "false" only
//! - floats convert to integers only when they carry no fractional part
//! - every other cross-kind conversion is a conversion error naming both kinds
//!
//! Copyright (c) 2025 Structbridge Team
//! Licensed under the Apache-2.0 license

use crate::node::Node;
use crate::{Error, Result};
use std::str::FromStr;

/// Integer widths reachable through the coercion table
trait Integer: Sized + FromStr {
    const NAME: &'static str;

    fn narrow(value: i64) -> Self;
}

macro_rules! impl_integer {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl Integer for $ty {
                const NAME: &'static str = $name;

                #[inline]
                fn narrow(value: i64) -> Self {
                    value as $ty
                }
            }
        )*
    };
}

impl_integer! {
    i8 => "Byte",
    i16 => "Int16",
    i32 => "Int32",
    i64 => "Int64",
}

/// 2^63; `i64::MAX as f64` rounds up to this value, so the bound is exclusive
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

fn to_integer<T: Integer>(node: &Node) -> Result<T> {
    match node {
        Node::Int(value) => Ok(T::narrow(*value)),
        Node::Float(value) => {
            if value.fract() == 0.0 && *value >= i64::MIN as f64 && *value < I64_LIMIT {
                Ok(T::narrow(*value as i64))
            } else {
                Err(Error::conversion_of(node.kind(), T::NAME, value))
            }
        }
        Node::Str(text) => text
            .parse::<T>()
            .map_err(|_| Error::conversion_of(node.kind(), T::NAME, text)),
        other => Err(Error::conversion(other.kind(), T::NAME)),
    }
}

pub fn to_i8(node: &Node) -> Result<i8> {
    to_integer(node)
}

pub fn to_i16(node: &Node) -> Result<i16> {
    to_integer(node)
}

pub fn to_i32(node: &Node) -> Result<i32> {
    to_integer(node)
}

pub fn to_i64(node: &Node) -> Result<i64> {
    to_integer(node)
}

pub fn to_f64(node: &Node) -> Result<f64> {
    match node {
        Node::Float(value) => Ok(*value),
        Node::Int(value) => Ok(*value as f64),
        Node::Str(text) => parse_decimal(text)
            .ok_or_else(|| Error::conversion_of(node.kind(), "Double", text)),
        other => Err(Error::conversion(other.kind(), "Double")),
    }
}

pub fn to_bool(node: &Node) -> Result<bool> {
    match node {
        Node::Bool(value) => Ok(*value),
        Node::Str(text) if text.eq_ignore_ascii_case("true") => Ok(true),
        Node::Str(text) if text.eq_ignore_ascii_case("false") => Ok(false),
        Node::Str(text) => Err(Error::conversion_of(node.kind(), "Bool", text)),
        other => Err(Error::conversion(other.kind(), "Bool")),
    }
}

/// String form of a scalar node; also used for map keys
pub fn to_text(node: &Node) -> Result<String> {
    match node {
        Node::Str(text) => Ok(text.clone()),
        Node::Bool(value) => Ok(value.to_string()),
        Node::Int(value) => Ok(value.to_string()),
        Node::Float(value) => Ok(format_decimal(*value)),
        other => Err(Error::conversion(other.kind(), "String")),
    }
}

/// Decimal parse that refuses the non-numeral spellings `f64::from_str` accepts
fn parse_decimal(text: &str) -> Option<f64> {
    let numeral = text
        .strip_prefix(['+', '-'])
        .unwrap_or(text);
    let starts_with_digit = numeral
        .chars()
        .next()
        .map_or(false, |c| c.is_ascii_digit() || c == '.');
    if !starts_with_digit {
        return None;
    }
    text.parse::<f64>().ok()
}

/// Shortest round-trip decimal; integral values keep a trailing `.0`
fn format_decimal(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}
