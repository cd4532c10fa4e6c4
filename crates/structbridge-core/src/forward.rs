//! Forward transformation (Source to Target)
//!
//! Runs in two stages that only meet at the intermediate tree: a Source
//! record is lowered into a [`Node`] map following its type descriptor, then
//! the map is raised into a [`DynamicRecord`] following the generated schema.
//!
//! Copyright (c) 2025 Structbridge Team
//! Licensed under the Apache-2.0 license

use crate::coerce;
use crate::descriptor::{DescriptorRegistry, FieldDescriptor, TypeDescriptor, TypeTag};
use crate::node::Node;
use crate::policy::{MappingPolicy, NullOutcome};
use crate::record::{DynamicRecord, TargetValue};
use crate::schema::{CollectionKind, GeneratedSchema, SchemaGenerator, SchemaRef, SlotType};
use crate::source::{SourceRecord, SourceValue, TypeRef};
use crate::{Error, Result};
use log::warn;
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct ForwardTransformer<'a> {
    registry: &'a DescriptorRegistry,
    schemas: &'a SchemaGenerator,
    policy: &'a MappingPolicy,
}

impl<'a> ForwardTransformer<'a> {
    pub fn new(
        registry: &'a DescriptorRegistry,
        schemas: &'a SchemaGenerator,
        policy: &'a MappingPolicy,
    ) -> Self {
        Self {
            registry,
            schemas,
            policy,
        }
    }

    /// Build a Target record from a Source record
    pub fn transform(&self, source: &dyn SourceRecord) -> Result<DynamicRecord> {
        let type_ref = source.type_ref();
        let descriptor = self.registry.get_or_create(type_ref)?;
        let schema = self.schemas.get_or_create(&descriptor, self.registry);

        let node = self.record_to_node(source, &descriptor)?;
        self.node_to_record(&node, &descriptor, schema)
    }

    /// Lower a Source record into a map node, one key per declared field
    ///
    /// Absent fields become [`Node::Null`]; the null policy is applied when
    /// the node is raised.
    pub fn lower(&self, source: &dyn SourceRecord) -> Result<Node> {
        let descriptor = self.registry.get_or_create(source.type_ref())?;
        self.record_to_node(source, &descriptor)
    }

    fn record_to_node(&self, source: &dyn SourceRecord, descriptor: &TypeDescriptor) -> Result<Node> {
        let mut entries = BTreeMap::new();
        for field in descriptor.fields() {
            let node = match source.read_field(&field.name) {
                None => Node::Null,
                Some(value) => self
                    .value_to_node(value, field)
                    .map_err(|e| e.at_path(&field.name))?,
            };
            entries.insert(field.name.clone(), node);
        }
        Ok(Node::Map(entries))
    }

    fn value_to_node(&self, value: SourceValue, field: &FieldDescriptor) -> Result<Node> {
        let node = match value {
            SourceValue::Bool(v) => Node::Bool(v),
            SourceValue::Byte(v) => Node::Int(i64::from(v)),
            SourceValue::I16(v) => Node::Int(i64::from(v)),
            SourceValue::I32(v) => Node::Int(i64::from(v)),
            SourceValue::I64(v) => Node::Int(v),
            SourceValue::Double(v) => Node::Float(v),
            SourceValue::Str(v) => Node::Str(v),
            SourceValue::List(items) | SourceValue::Set(items) => {
                let element = field.element.as_deref().unwrap_or(field);
                let mut nodes = Vec::with_capacity(items.len());
                for (index, item) in items.into_iter().enumerate() {
                    nodes.push(
                        self.value_to_node(item, element)
                            .map_err(|e| e.at_path(&format!("[{}]", index)))?,
                    );
                }
                if field.type_tag == TypeTag::Set {
                    Node::Seq(Node::dedup(nodes))
                } else {
                    Node::Seq(nodes)
                }
            }
            SourceValue::Map(pairs) => {
                let key_field = field.key.as_deref().unwrap_or(field);
                let value_field = field.value.as_deref().unwrap_or(field);
                let mut entries = BTreeMap::new();
                for (index, (key, value)) in pairs.into_iter().enumerate() {
                    let key = self
                        .value_to_node(key, key_field)
                        .and_then(|node| coerce::to_text(&node))
                        .map_err(|e| e.at_path(&format!("[key {}]", index)))?;
                    let node = self
                        .value_to_node(value, value_field)
                        .map_err(|e| e.at_path(&format!("[{}]", key)))?;
                    entries.insert(key, node);
                }
                Node::Map(entries)
            }
            SourceValue::Struct(record) => {
                let nested = field.nested_type.unwrap_or_else(|| record.type_ref());
                let descriptor = self.registry.get_or_create(nested)?;
                self.record_to_node(&*record, &descriptor)?
            }
        };
        Ok(node)
    }

    fn node_to_record(
        &self,
        node: &Node,
        descriptor: &TypeDescriptor,
        schema: Arc<GeneratedSchema>,
    ) -> Result<DynamicRecord> {
        let entries = node
            .as_map()
            .ok_or_else(|| Error::conversion(node.kind(), descriptor.name()))?;
        let mut record = DynamicRecord::new(Arc::clone(&schema));

        for slot in schema.slots() {
            match entries.get(&slot.name) {
                None | Some(Node::Null) => {
                    match self.policy.resolve_null(descriptor.name(), &slot.name)? {
                        NullOutcome::ExplicitNull => record.set(&slot.name, TargetValue::Null)?,
                        NullOutcome::ZeroValue => {
                            if let Some(zero) = zero_value(&slot.slot_type) {
                                record.set(&slot.name, zero)?;
                            }
                        }
                        NullOutcome::Skip => {}
                    }
                }
                Some(value) => {
                    let converted = self
                        .node_to_value(value, &slot.slot_type, &slot.name)
                        .map_err(|e| e.at_path(&slot.name))?;
                    record.set(&slot.name, converted)?;
                }
            }
        }

        Ok(record)
    }

    fn node_to_value(&self, node: &Node, slot_type: &SlotType, field: &str) -> Result<TargetValue> {
        let value = match slot_type {
            SlotType::Bool => TargetValue::Bool(coerce::to_bool(node)?),
            SlotType::Byte => TargetValue::Byte(coerce::to_i8(node)?),
            SlotType::Int16 => TargetValue::Int16(coerce::to_i16(node)?),
            SlotType::Int32 => TargetValue::Int32(coerce::to_i32(node)?),
            SlotType::Int64 => TargetValue::Int64(coerce::to_i64(node)?),
            SlotType::Double => TargetValue::Double(coerce::to_f64(node)?),
            SlotType::String => TargetValue::Str(coerce::to_text(node)?),
            SlotType::Repeated { kind, element } => {
                let items = node
                    .as_seq()
                    .ok_or_else(|| Error::conversion(node.kind(), slot_type.name()))?;
                let items = match kind {
                    CollectionKind::Set => Node::dedup(items.to_vec()),
                    CollectionKind::List | CollectionKind::Array => items.to_vec(),
                };

                let mut values = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let value = if item.is_null() {
                        Err(Error::conversion(item.kind(), element.name()))
                    } else {
                        self.node_to_value(item, element, field)
                    };
                    values.push(value.map_err(|e| e.at_path(&format!("[{}]", index)))?);
                }

                match kind {
                    CollectionKind::List => TargetValue::List(values),
                    CollectionKind::Set => TargetValue::Set(values),
                    CollectionKind::Array => TargetValue::Array(values),
                }
            }
            SlotType::Keyed { value } => {
                let entries = node
                    .as_map()
                    .ok_or_else(|| Error::conversion(node.kind(), slot_type.name()))?;
                let mut converted = BTreeMap::new();
                for (key, item) in entries {
                    let item = if item.is_null() {
                        Err(Error::conversion(item.kind(), value.name()))
                    } else {
                        self.node_to_value(item, value, field)
                    };
                    converted.insert(key.clone(), item.map_err(|e| e.at_path(&format!("[{}]", key)))?);
                }
                TargetValue::Map(converted)
            }
            SlotType::Record(SchemaRef { source: Some(nested), .. }) => {
                TargetValue::Record(self.nested_record(node, *nested)?)
            }
            SlotType::Record(SchemaRef { source: None, name }) => {
                TargetValue::Record(generic_record(node, name, field)?)
            }
            SlotType::Untyped => TargetValue::from_node(node),
        };
        Ok(value)
    }

    fn nested_record(&self, node: &Node, nested: TypeRef) -> Result<DynamicRecord> {
        let descriptor = self.registry.get_or_create(nested)?;
        let schema = self.schemas.get_or_create(&descriptor, self.registry);
        self.node_to_record(node, &descriptor, schema)
    }
}

/// Zero value for a slot under the `default` null policy; records stay absent
fn zero_value(slot_type: &SlotType) -> Option<TargetValue> {
    let zero = match slot_type {
        SlotType::Bool => TargetValue::Bool(false),
        SlotType::Byte => TargetValue::Byte(0),
        SlotType::Int16 => TargetValue::Int16(0),
        SlotType::Int32 => TargetValue::Int32(0),
        SlotType::Int64 => TargetValue::Int64(0),
        SlotType::Double => TargetValue::Double(0.0),
        SlotType::String | SlotType::Untyped => TargetValue::Str(String::new()),
        SlotType::Repeated { kind, .. } => match kind {
            CollectionKind::List => TargetValue::List(Vec::new()),
            CollectionKind::Set => TargetValue::Set(Vec::new()),
            CollectionKind::Array => TargetValue::Array(Vec::new()),
        },
        SlotType::Keyed { .. } => TargetValue::Map(BTreeMap::new()),
        SlotType::Record(_) => return None,
    };
    Some(zero)
}

/// Best-effort record synthesized from the keys observed in `node`
///
/// Scalars are kept as they are; nested sequences and maps are stored as
/// compact JSON text. The result cannot be mapped back into a typed record.
fn generic_record(node: &Node, name: &str, field: &str) -> Result<DynamicRecord> {
    let entries = node
        .as_map()
        .ok_or_else(|| Error::conversion(node.kind(), name))?;
    warn!(
        "No concrete type for struct field '{}'; building generic record {} from {} observed keys",
        field,
        name,
        entries.len()
    );

    let schema = Arc::new(GeneratedSchema::generic(name, entries.keys().cloned()));
    let mut record = DynamicRecord::new(schema);
    for (key, value) in entries {
        let value = match value {
            Node::Seq(_) | Node::Map(_) => TargetValue::Str(value.to_string()),
            scalar => TargetValue::from_node(scalar),
        };
        record.set(key, value)?;
    }
    Ok(record)
}
