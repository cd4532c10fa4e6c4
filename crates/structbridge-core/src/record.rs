//! Dynamic Target records
//!
//! A [`DynamicRecord`] is an arena of named slots allocated from a
//! [`GeneratedSchema`]. A slot is either unset or holds a [`TargetValue`];
//! [`TargetValue::Null`] is the explicit null marker and counts as set.
//!
//! Copyright (c) 2025 Structbridge Team
//! Licensed under the Apache-2.0 license

use crate::node::Node;
use crate::schema::GeneratedSchema;
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum TargetValue {
    Null,
    Bool(bool),
    Byte(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Double(f64),
    Str(String),
    List(Vec<TargetValue>),
    Set(Vec<TargetValue>),
    Array(Vec<TargetValue>),
    Map(BTreeMap<String, TargetValue>),
    Record(DynamicRecord),
}

impl TargetValue {
    pub fn kind(&self) -> &'static str {
        match self {
            TargetValue::Null => "Null",
            TargetValue::Bool(_) => "Bool",
            TargetValue::Byte(_) => "Byte",
            TargetValue::Int16(_) => "Int16",
            TargetValue::Int32(_) => "Int32",
            TargetValue::Int64(_) => "Int64",
            TargetValue::Double(_) => "Double",
            TargetValue::Str(_) => "String",
            TargetValue::List(_) => "List",
            TargetValue::Set(_) => "Set",
            TargetValue::Array(_) => "Array",
            TargetValue::Map(_) => "Map",
            TargetValue::Record(_) => "Record",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, TargetValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TargetValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Any integer slot value, widened
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            TargetValue::Byte(v) => Some(i64::from(*v)),
            TargetValue::Int16(v) => Some(i64::from(*v)),
            TargetValue::Int32(v) => Some(i64::from(*v)),
            TargetValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TargetValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TargetValue::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Elements of a list, set or array
    pub fn as_items(&self) -> Option<&[TargetValue]> {
        match self {
            TargetValue::List(items) | TargetValue::Set(items) | TargetValue::Array(items) => {
                Some(items)
            }
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, TargetValue>> {
        match self {
            TargetValue::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&DynamicRecord> {
        match self {
            TargetValue::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Lower into the intermediate tree
    pub fn to_node(&self) -> Node {
        match self {
            TargetValue::Null => Node::Null,
            TargetValue::Bool(v) => Node::Bool(*v),
            TargetValue::Byte(v) => Node::Int(i64::from(*v)),
            TargetValue::Int16(v) => Node::Int(i64::from(*v)),
            TargetValue::Int32(v) => Node::Int(i64::from(*v)),
            TargetValue::Int64(v) => Node::Int(*v),
            TargetValue::Double(v) => Node::Float(*v),
            TargetValue::Str(v) => Node::Str(v.clone()),
            TargetValue::List(items) | TargetValue::Set(items) | TargetValue::Array(items) => {
                Node::Seq(items.iter().map(TargetValue::to_node).collect())
            }
            TargetValue::Map(entries) => Node::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_node()))
                    .collect(),
            ),
            TargetValue::Record(record) => record.to_node(),
        }
    }

    /// Structural conversion used for untyped slots
    pub fn from_node(node: &Node) -> Self {
        match node {
            Node::Null => TargetValue::Null,
            Node::Bool(v) => TargetValue::Bool(*v),
            Node::Int(v) => TargetValue::Int64(*v),
            Node::Float(v) => TargetValue::Double(*v),
            Node::Str(v) => TargetValue::Str(v.clone()),
            Node::Seq(items) => TargetValue::List(items.iter().map(TargetValue::from_node).collect()),
            Node::Map(entries) => TargetValue::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), TargetValue::from_node(v)))
                    .collect(),
            ),
        }
    }
}

/// Dynamic record conforming to a generated schema
#[derive(Debug, Clone)]
pub struct DynamicRecord {
    schema: Arc<GeneratedSchema>,
    slots: Vec<Option<TargetValue>>,
}

impl DynamicRecord {
    /// Allocate a record with every slot unset
    pub fn new(schema: Arc<GeneratedSchema>) -> Self {
        let slots = vec![None; schema.len()];
        Self { schema, slots }
    }

    pub fn schema(&self) -> &Arc<GeneratedSchema> {
        &self.schema
    }

    /// Value of a set slot; `None` when unset or unknown
    pub fn get(&self, name: &str) -> Option<&TargetValue> {
        self.schema
            .position(name)
            .and_then(|position| self.slots[position].as_ref())
    }

    /// Store `value`, checking it against the slot type
    pub fn set(&mut self, name: &str, value: TargetValue) -> Result<()> {
        let position = self.schema.position(name).ok_or_else(|| Error::Transformation {
            message: format!("schema {} has no slot named '{}'", self.schema.name(), name),
            context: Some(self.schema.name().to_string()),
            source: None,
        })?;

        let slot_type = &self.schema.slots()[position].slot_type;
        if !slot_type.accepts(&value) {
            return Err(Error::conversion(value.kind(), slot_type.name()).at_path(name));
        }

        self.slots[position] = Some(value);
        Ok(())
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Clear a slot, returning its previous value
    pub fn unset(&mut self, name: &str) -> Option<TargetValue> {
        let position = self.schema.position(name)?;
        self.slots[position].take()
    }

    pub fn set_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Set slots in schema order
    pub fn iter_set(&self) -> impl Iterator<Item = (&str, &TargetValue)> + '_ {
        self.schema
            .slots()
            .iter()
            .zip(&self.slots)
            .filter_map(|(slot, value)| value.as_ref().map(|v| (slot.name.as_str(), v)))
    }

    /// Copy every set slot of `other` whose name exists here
    ///
    /// Returns the number of slots copied. If any value is rejected by its
    /// slot type the record is left as it was.
    pub fn merge_from(&mut self, other: &DynamicRecord) -> Result<usize> {
        let mut merged = self.clone();
        let mut copied = 0;
        for (name, value) in other.iter_set() {
            if merged.schema.position(name).is_some() {
                merged.set(name, value.clone())?;
                copied += 1;
            }
        }
        *self = merged;
        Ok(copied)
    }

    /// Lower the set slots into a map node; unset slots are absent
    pub fn to_node(&self) -> Node {
        Node::Map(
            self.iter_set()
                .map(|(name, value)| (name.to_string(), value.to_node()))
                .collect(),
        )
    }
}

impl PartialEq for DynamicRecord {
    fn eq(&self, other: &Self) -> bool {
        self.schema.name() == other.schema.name()
            && self.schema.source() == other.schema.source()
            && self.iter_set().eq(other.iter_set())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::TypeDescriptor;
    use crate::error::ErrorCode;
    use crate::policy::CollectionPreference;
    use crate::source::{Describable, FieldDecl, SourceValue, TypeRef};

    fn record() -> DynamicRecord {
        DynamicRecord::new(Arc::new(GeneratedSchema::generic("test", ["a", "b", "c"])))
    }

    #[test]
    fn test_slots_start_unset() {
        let record = record();
        assert_eq!(record.set_count(), 0);
        assert!(!record.is_set("a"));
        assert_eq!(record.to_node(), Node::Map(BTreeMap::new()));
    }

    #[test]
    fn test_explicit_null_counts_as_set() {
        let mut record = record();
        record.set("b", TargetValue::Null).unwrap();
        assert!(record.is_set("b"));
        assert_eq!(record.set_count(), 1);
        assert_eq!(record.to_node().get("b"), Some(&Node::Null));

        assert_eq!(record.unset("b"), Some(TargetValue::Null));
        assert_eq!(record.set_count(), 0);
    }

    #[test]
    fn test_unknown_slot_is_transformation_error() {
        let mut record = record();
        let err = record.set("missing", TargetValue::Bool(true)).unwrap_err();
        assert!(matches!(err, Error::Transformation { .. }));
    }

    #[test]
    fn test_merge_from_copies_matching_slots() {
        let mut source = DynamicRecord::new(Arc::new(GeneratedSchema::generic("other", ["a", "z"])));
        source.set("a", TargetValue::Int32(5)).unwrap();
        source.set("z", TargetValue::Str("ignored".into())).unwrap();

        let mut target = record();
        assert_eq!(target.merge_from(&source).unwrap(), 1);
        assert_eq!(target.get("a").and_then(TargetValue::as_i64), Some(5));

        let set: Vec<_> = target.iter_set().map(|(name, _)| name).collect();
        assert_eq!(set, ["a"]);
    }

    #[derive(Debug, Clone, Default)]
    struct Host;

    impl Describable for Host {
        const TYPE_NAME: &'static str = "test.Host";

        fn describe() -> Vec<FieldDecl> {
            vec![
                FieldDecl::optional::<i32>("a"),
                FieldDecl::optional::<String>("b"),
            ]
        }

        fn field(&self, _name: &str) -> Option<SourceValue> {
            None
        }

        fn set_field(&mut self, _name: &str, _value: Option<SourceValue>) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_rejected_merge_leaves_record_unchanged() {
        let descriptor = TypeDescriptor::derive(TypeRef::of::<Host>()).unwrap();
        let schema = GeneratedSchema::from_descriptor(&descriptor, CollectionPreference::List);
        let mut target = DynamicRecord::new(Arc::new(schema));
        target.set("b", TargetValue::Str("kept".into())).unwrap();

        let mut incoming = DynamicRecord::new(Arc::new(GeneratedSchema::generic("wire", ["a", "b"])));
        incoming.set("a", TargetValue::Int32(1)).unwrap();
        incoming.set("b", TargetValue::Int32(2)).unwrap();

        let err = target.merge_from(&incoming).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConversionError);
        assert_eq!(target.set_count(), 1);
        assert!(!target.is_set("a"));
        assert_eq!(target.get("b").and_then(TargetValue::as_str), Some("kept"));
    }

    #[test]
    fn test_from_node_is_structural() {
        let node: Node = serde_json::from_str(r#"{"x": [1, 2.5, "s"], "y": null}"#).unwrap();
        let value = TargetValue::from_node(&node);
        let entries = value.as_map().unwrap();
        assert_eq!(
            entries["x"],
            TargetValue::List(vec![
                TargetValue::Int64(1),
                TargetValue::Double(2.5),
                TargetValue::Str("s".into())
            ])
        );
        assert!(entries["y"].is_null());
        assert_eq!(value.to_node(), node);
    }
}
