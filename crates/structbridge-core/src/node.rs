//! Intermediate tree used as the pivot between source and target values
//!
//! Neither transformer copies fields directly: source values are lowered to a
//! [`Node`] and target values are built from one (and vice versa), so every
//! representation mismatch is handled in a single conversion layer.
//!
//! Copyright (c) 2025 Structbridge Team
//! Licensed under the Apache-2.0 license

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Canonical pivot value
///
/// Serialized untagged, so a JSON document maps onto a node tree directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Seq(Vec<Node>),
    Map(BTreeMap<String, Node>),
}

impl Node {
    /// Short name of the node kind, used in conversion errors
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Null => "Null",
            Node::Bool(_) => "Bool",
            Node::Int(_) => "Int64",
            Node::Float(_) => "Float64",
            Node::Str(_) => "Str",
            Node::Seq(_) => "Seq",
            Node::Map(_) => "Map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Node::Bool(_) | Node::Int(_) | Node::Float(_) | Node::Str(_)
        )
    }

    pub fn as_seq(&self) -> Option<&[Node]> {
        match self {
            Node::Seq(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Node>> {
        match self {
            Node::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Look up a key when this node is a map
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_map().and_then(|entries| entries.get(key))
    }

    /// Drop repeated elements, keeping the first occurrence of each
    pub fn dedup(items: Vec<Node>) -> Vec<Node> {
        let mut unique: Vec<Node> = Vec::with_capacity(items.len());
        for item in items {
            if !unique.contains(&item) {
                unique.push(item);
            }
        }
        unique
    }
}

impl fmt::Display for Node {
    /// Compact JSON rendering
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(text) => f.write_str(&text),
            Err(_) => Err(fmt::Error),
        }
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Node::Bool(value)
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Node::Int(value)
    }
}

impl From<f64> for Node {
    fn from(value: f64) -> Self {
        Node::Float(value)
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::Str(value.to_string())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::Str(value)
    }
}

impl From<Vec<Node>> for Node {
    fn from(items: Vec<Node>) -> Self {
        Node::Seq(items)
    }
}

impl From<BTreeMap<String, Node>> for Node {
    fn from(entries: BTreeMap<String, Node>) -> Self {
        Node::Map(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_parses_into_nodes() {
        let node: Node =
            serde_json::from_str(r#"{"id": 123, "score": 95.5, "tags": ["a", null], "ok": true}"#)
                .unwrap();

        assert_eq!(node.get("id"), Some(&Node::Int(123)));
        assert_eq!(node.get("score"), Some(&Node::Float(95.5)));
        assert_eq!(node.get("ok"), Some(&Node::Bool(true)));
        assert_eq!(
            node.get("tags"),
            Some(&Node::Seq(vec![Node::from("a"), Node::Null]))
        );
    }

    #[test]
    fn test_display_is_compact_json() {
        let mut entries = BTreeMap::new();
        entries.insert("b".to_string(), Node::Int(2));
        entries.insert("a".to_string(), Node::Seq(vec![Node::Bool(false)]));
        assert_eq!(Node::Map(entries).to_string(), r#"{"a":[false],"b":2}"#);
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let items = vec![Node::from("x"), Node::from("y"), Node::from("x")];
        assert_eq!(Node::dedup(items), vec![Node::from("x"), Node::from("y")]);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(Node::Null.kind(), "Null");
        assert_eq!(Node::Float(1.0).kind(), "Float64");
        assert!(Node::Str(String::new()).is_scalar());
        assert!(!Node::Seq(vec![]).is_scalar());
    }
}
