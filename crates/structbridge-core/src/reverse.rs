//! Reverse transformation (Target to Source)
//!
//! The Target record is lowered into the intermediate tree and a fresh Source
//! instance is populated from it field by field, following the Source type's
//! descriptor rather than the record's own schema.
//!
//! Copyright (c) 2025 Structbridge Team
//! Licensed under the Apache-2.0 license

use crate::coerce;
use crate::descriptor::{DescriptorRegistry, FieldDescriptor, TypeDescriptor, TypeTag};
use crate::node::Node;
use crate::policy::{MappingPolicy, NullOutcome};
use crate::record::DynamicRecord;
use crate::source::{SourceRecord, SourceValue, TypeRef};
use crate::validator::Validator;
use crate::{Error, Result};
use log::warn;

/// What to do with one Source field
enum FieldWrite {
    /// Write the value; `None` is an explicit null
    Value(Option<SourceValue>),
    /// Best-effort write for a field without a usable type tag
    Structural(Option<SourceValue>),
    /// Leave the constructor default in place
    Keep,
}

pub struct ReverseTransformer<'a> {
    registry: &'a DescriptorRegistry,
    policy: &'a MappingPolicy,
}

impl<'a> ReverseTransformer<'a> {
    pub fn new(registry: &'a DescriptorRegistry, policy: &'a MappingPolicy) -> Self {
        Self { registry, policy }
    }

    /// Build a fresh Source instance of `type_ref` from a Target record
    ///
    /// Under strict validation the record is checked first.
    pub fn transform(
        &self,
        target: &DynamicRecord,
        type_ref: TypeRef,
    ) -> Result<Box<dyn SourceRecord>> {
        let descriptor = self.registry.get_or_create(type_ref)?;
        Validator::new(self.registry, self.policy).check(target, &descriptor)?;

        let node = target.to_node();
        self.node_to_record(&node, &descriptor)
    }

    /// Build a fresh Source instance of `type_ref` from a map node
    pub fn raise(&self, node: &Node, type_ref: TypeRef) -> Result<Box<dyn SourceRecord>> {
        let descriptor = self.registry.get_or_create(type_ref)?;
        self.node_to_record(node, &descriptor)
    }

    fn node_to_record(
        &self,
        node: &Node,
        descriptor: &TypeDescriptor,
    ) -> Result<Box<dyn SourceRecord>> {
        let entries = node
            .as_map()
            .ok_or_else(|| Error::conversion(node.kind(), descriptor.name()))?;
        let mut instance = descriptor.type_ref().construct();

        for field in descriptor.fields() {
            let write = match entries.get(&field.name) {
                None | Some(Node::Null) => {
                    match self.policy.resolve_null(descriptor.name(), &field.name)? {
                        NullOutcome::ExplicitNull => FieldWrite::Value(None),
                        NullOutcome::ZeroValue => match zero_value(field) {
                            Some(zero) => FieldWrite::Value(Some(zero)),
                            None => FieldWrite::Keep,
                        },
                        NullOutcome::Skip => FieldWrite::Keep,
                    }
                }
                Some(value) => self
                    .field_write(value, field)
                    .map_err(|e| e.at_path(&field.name))?,
            };

            match write {
                FieldWrite::Value(value) => instance
                    .write_field(&field.name, value)
                    .map_err(|e| e.at_path(&field.name))?,
                FieldWrite::Structural(value) => {
                    if let Err(err) = instance.write_field(&field.name, value) {
                        warn!(
                            "Could not write untyped field {}.{}: {}; keeping default",
                            descriptor.name(),
                            field.name,
                            err
                        );
                    }
                }
                FieldWrite::Keep => {}
            }
        }

        Ok(instance)
    }

    fn field_write(&self, node: &Node, field: &FieldDescriptor) -> Result<FieldWrite> {
        match (field.type_tag, field.nested_type) {
            (TypeTag::Struct, None) => {
                warn!(
                    "Struct field '{}' has no concrete type; generic record not mapped back",
                    field.name
                );
                Ok(FieldWrite::Keep)
            }
            (TypeTag::Unsupported, _) => Ok(FieldWrite::Structural(structural(node))),
            _ => self
                .node_to_value(node, field)
                .map(|value| FieldWrite::Value(Some(value))),
        }
    }

    fn node_to_value(&self, node: &Node, field: &FieldDescriptor) -> Result<SourceValue> {
        let value = match field.type_tag {
            TypeTag::Bool => SourceValue::Bool(coerce::to_bool(node)?),
            TypeTag::Byte => SourceValue::Byte(coerce::to_i8(node)?),
            TypeTag::Int16 => SourceValue::I16(coerce::to_i16(node)?),
            TypeTag::Int32 => SourceValue::I32(coerce::to_i32(node)?),
            TypeTag::Int64 => SourceValue::I64(coerce::to_i64(node)?),
            TypeTag::Double => SourceValue::Double(coerce::to_f64(node)?),
            TypeTag::String => SourceValue::Str(coerce::to_text(node)?),
            TypeTag::List | TypeTag::Set => {
                let items = node
                    .as_seq()
                    .ok_or_else(|| Error::conversion(node.kind(), field.type_tag.as_str()))?;
                let element = child(&field.element, field, "element")?;

                let mut values = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    values.push(
                        self.element_value(item, element)
                            .map_err(|e| e.at_path(&format!("[{}]", index)))?,
                    );
                }
                if field.type_tag == TypeTag::Set {
                    SourceValue::Set(values)
                } else {
                    SourceValue::List(values)
                }
            }
            TypeTag::Map => {
                let entries = node
                    .as_map()
                    .ok_or_else(|| Error::conversion(node.kind(), "Map"))?;
                let key_field = child(&field.key, field, "key")?;
                let value_field = child(&field.value, field, "value")?;

                let mut pairs = Vec::with_capacity(entries.len());
                for (key, item) in entries {
                    let segment = format!("[{}]", key);
                    let key = self
                        .element_value(&Node::Str(key.clone()), key_field)
                        .map_err(|e| e.at_path(&segment))?;
                    let item = self
                        .element_value(item, value_field)
                        .map_err(|e| e.at_path(&segment))?;
                    pairs.push((key, item));
                }
                SourceValue::Map(pairs)
            }
            TypeTag::Struct => match field.nested_type {
                Some(nested) => {
                    let descriptor = self.registry.get_or_create(nested)?;
                    SourceValue::Struct(self.node_to_record(node, &descriptor)?)
                }
                None => structural(node)
                    .ok_or_else(|| Error::conversion(node.kind(), "Struct"))?,
            },
            TypeTag::Unsupported => structural(node)
                .ok_or_else(|| Error::conversion(node.kind(), "Unsupported"))?,
        };
        Ok(value)
    }

    /// Collection elements and map values may not be null
    fn element_value(&self, node: &Node, element: &FieldDescriptor) -> Result<SourceValue> {
        if node.is_null() {
            return Err(Error::conversion(node.kind(), element.type_tag.as_str()));
        }
        self.node_to_value(node, element)
    }
}

fn child<'d>(
    descriptor: &'d Option<Box<FieldDescriptor>>,
    field: &FieldDescriptor,
    role: &str,
) -> Result<&'d FieldDescriptor> {
    descriptor.as_deref().ok_or_else(|| Error::Transformation {
        message: format!("{} field '{}' has no {} descriptor", field.type_tag, field.name, role),
        context: Some(field.name.clone()),
        source: None,
    })
}

/// Zero value for a field under the `default` null policy; structs keep
/// their constructor default
fn zero_value(field: &FieldDescriptor) -> Option<SourceValue> {
    let zero = match field.type_tag {
        TypeTag::Bool => SourceValue::Bool(false),
        TypeTag::Byte => SourceValue::Byte(0),
        TypeTag::Int16 => SourceValue::I16(0),
        TypeTag::Int32 => SourceValue::I32(0),
        TypeTag::Int64 => SourceValue::I64(0),
        TypeTag::Double => SourceValue::Double(0.0),
        TypeTag::String => SourceValue::Str(String::new()),
        TypeTag::List => SourceValue::List(Vec::new()),
        TypeTag::Set => SourceValue::Set(Vec::new()),
        TypeTag::Map => SourceValue::Map(Vec::new()),
        TypeTag::Struct | TypeTag::Unsupported => return None,
    };
    Some(zero)
}

/// Shape-preserving conversion for values without a type tag
fn structural(node: &Node) -> Option<SourceValue> {
    let value = match node {
        Node::Null => return None,
        Node::Bool(v) => SourceValue::Bool(*v),
        Node::Int(v) => SourceValue::I64(*v),
        Node::Float(v) => SourceValue::Double(*v),
        Node::Str(v) => SourceValue::Str(v.clone()),
        Node::Seq(items) => SourceValue::List(items.iter().filter_map(structural).collect()),
        Node::Map(entries) => SourceValue::Map(
            entries
                .iter()
                .filter_map(|(k, v)| Some((SourceValue::Str(k.clone()), structural(v)?)))
                .collect(),
        ),
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::NullHandling;
    use crate::source::{downcast_record, DeclaredType, Describable, FieldDecl, SourceField};
    use std::collections::{BTreeMap, BTreeSet};

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Sample {
        id: i32,
        ratio: f64,
        flags: BTreeSet<bool>,
        counts: BTreeMap<i32, i64>,
        note: Option<String>,
        extra: String,
    }

    impl Describable for Sample {
        const TYPE_NAME: &'static str = "test.Sample";

        fn describe() -> Vec<FieldDecl> {
            vec![
                FieldDecl::required::<i32>("id"),
                FieldDecl::optional::<f64>("ratio"),
                FieldDecl::optional::<BTreeSet<bool>>("flags"),
                FieldDecl::optional::<BTreeMap<i32, i64>>("counts"),
                FieldDecl::optional::<Option<String>>("note"),
                FieldDecl::new("extra", DeclaredType::Opaque("Extra"), false),
            ]
        }

        fn field(&self, name: &str) -> Option<SourceValue> {
            match name {
                "id" => self.id.to_source(),
                "ratio" => self.ratio.to_source(),
                "flags" => self.flags.to_source(),
                "counts" => self.counts.to_source(),
                "note" => self.note.to_source(),
                "extra" => self.extra.to_source(),
                _ => None,
            }
        }

        fn set_field(&mut self, name: &str, value: Option<SourceValue>) -> Result<()> {
            match name {
                "id" => self.id = SourceField::from_source(value)?,
                "ratio" => self.ratio = SourceField::from_source(value)?,
                "flags" => self.flags = SourceField::from_source(value)?,
                "counts" => self.counts = SourceField::from_source(value)?,
                "note" => self.note = SourceField::from_source(value)?,
                "extra" => self.extra = SourceField::from_source(value)?,
                _ => {}
            }
            Ok(())
        }
    }

    fn raise(policy: MappingPolicy, json: &str) -> Result<Sample> {
        let registry = DescriptorRegistry::new();
        let node: Node = serde_json::from_str(json).unwrap();
        let record = ReverseTransformer::new(&registry, &policy)
            .raise(&node, TypeRef::of::<Sample>())?;
        downcast_record(record)
    }

    #[test]
    fn test_coercion_from_strings() {
        let sample = raise(
            MappingPolicy::default(),
            r#"{"id": "42", "ratio": 3, "flags": ["TRUE", false, true],
                "counts": {"7": 70}, "note": "n", "extra": "x"}"#,
        )
        .unwrap();

        assert_eq!(sample.id, 42);
        assert_eq!(sample.ratio, 3.0);
        assert_eq!(sample.flags, BTreeSet::from([false, true]));
        assert_eq!(sample.counts, BTreeMap::from([(7, 70)]));
        assert_eq!(sample.note.as_deref(), Some("n"));
        assert_eq!(sample.extra, "x");
    }

    #[test]
    fn test_invalid_numeral_fails_with_path() {
        let err = raise(MappingPolicy::default(), r#"{"id": "not_a_number"}"#).unwrap_err();
        match err {
            Error::Conversion { to, path, .. } => {
                assert_eq!(to, "Int32");
                assert_eq!(path.as_deref(), Some("id"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_null_collection_element_is_rejected() {
        let err = raise(MappingPolicy::default(), r#"{"id": 1, "flags": [true, null]}"#)
            .unwrap_err();
        assert!(matches!(err, Error::Conversion { ref path, .. } if path.as_deref() == Some("flags[1]")));
    }

    #[test]
    fn test_null_map_value_is_rejected() {
        let err = raise(MappingPolicy::default(), r#"{"id": 1, "counts": {"7": null}}"#)
            .unwrap_err();
        assert!(matches!(err, Error::Conversion { ref path, .. } if path.as_deref() == Some("counts[7]")));
    }

    #[test]
    fn test_untyped_field_failure_keeps_default() {
        let sample = raise(MappingPolicy::default(), r#"{"id": 1, "extra": [1, 2]}"#).unwrap();
        assert_eq!(sample.extra, "");
    }

    #[test]
    fn test_missing_fields_follow_null_policy() {
        let policy = MappingPolicy::new().with_null_handling(NullHandling::Omit);
        let registry = DescriptorRegistry::new();
        let node: Node = serde_json::from_str(r#"{"id": 5}"#).unwrap();
        let record = ReverseTransformer::new(&registry, &policy)
            .raise(&node, TypeRef::of::<Sample>())
            .unwrap();
        let sample: Sample = downcast_record(record).unwrap();
        assert_eq!(sample, Sample { id: 5, ..Sample::default() });

        let policy = MappingPolicy::new().with_null_handling(NullHandling::Default);
        let sample = raise(policy, r#"{"id": 5, "note": null}"#).unwrap();
        assert_eq!(sample.note.as_deref(), Some(""));

        let policy = MappingPolicy::new().with_null_handling(NullHandling::Error);
        let err = raise(policy, r#"{"id": 5}"#).unwrap_err();
        assert!(matches!(err, Error::NullInput { ref path, .. } if path == "ratio"));
    }
}
