//! Target-side schema generation
//!
//! A [`GeneratedSchema`] is the structural counterpart of a
//! [`TypeDescriptor`]: one named, typed slot per field, in field order.
//! Generation is total; a field that could not be classified becomes an
//! untyped slot with a logged warning.
//!
//! Copyright (c) 2025 Structbridge Team
//! Licensed under the Apache-2.0 license

use crate::descriptor::{DescriptorRegistry, FieldDescriptor, TypeDescriptor, TypeTag};
use crate::policy::CollectionPreference;
use crate::record::TargetValue;
use crate::source::TypeRef;
use dashmap::DashMap;
use log::{debug, warn};
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Target collection kind produced for a repeated slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    List,
    Set,
    Array,
}

impl From<CollectionPreference> for CollectionKind {
    fn from(preference: CollectionPreference) -> Self {
        match preference {
            CollectionPreference::List => CollectionKind::List,
            CollectionPreference::Set => CollectionKind::Set,
            CollectionPreference::Array => CollectionKind::Array,
        }
    }
}

/// Reference from a slot to the schema of a nested record
///
/// `source` is `None` for the generic fallback record, whose slots are only
/// known once a value is observed.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaRef {
    pub name: String,
    pub source: Option<TypeRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SlotType {
    Bool,
    Byte,
    Int16,
    Int32,
    Int64,
    Double,
    String,
    Repeated {
        kind: CollectionKind,
        element: Box<SlotType>,
    },
    /// String-keyed map
    Keyed {
        value: Box<SlotType>,
    },
    Record(SchemaRef),
    /// Accepts any value
    Untyped,
}

impl SlotType {
    fn for_field(field: &FieldDescriptor, preference: CollectionPreference) -> Self {
        let element = |descriptor: &Option<Box<FieldDescriptor>>| {
            Box::new(
                descriptor
                    .as_deref()
                    .map_or(SlotType::Untyped, |d| SlotType::for_field(d, preference)),
            )
        };

        match field.type_tag {
            TypeTag::Bool => SlotType::Bool,
            TypeTag::Byte => SlotType::Byte,
            TypeTag::Int16 => SlotType::Int16,
            TypeTag::Int32 => SlotType::Int32,
            TypeTag::Int64 => SlotType::Int64,
            TypeTag::Double => SlotType::Double,
            TypeTag::String => SlotType::String,
            TypeTag::List => SlotType::Repeated {
                kind: preference.into(),
                element: element(&field.element),
            },
            TypeTag::Set => SlotType::Repeated {
                kind: CollectionKind::Set,
                element: element(&field.element),
            },
            TypeTag::Map => SlotType::Keyed {
                value: element(&field.value),
            },
            TypeTag::Struct => SlotType::Record(match field.nested_type {
                Some(nested) => SchemaRef {
                    name: nested.name().to_string(),
                    source: Some(nested),
                },
                None => SchemaRef {
                    name: format!("{}Struct", field.name),
                    source: None,
                },
            }),
            TypeTag::Unsupported => {
                warn!(
                    "Field '{}' has no supported type; generating an untyped slot",
                    field.name
                );
                SlotType::Untyped
            }
        }
    }

    /// Whether `value` may be stored in a slot of this type
    ///
    /// The explicit null marker fits every slot.
    pub fn accepts(&self, value: &TargetValue) -> bool {
        match (self, value) {
            (_, TargetValue::Null) | (SlotType::Untyped, _) => true,
            (SlotType::Bool, TargetValue::Bool(_))
            | (SlotType::Byte, TargetValue::Byte(_))
            | (SlotType::Int16, TargetValue::Int16(_))
            | (SlotType::Int32, TargetValue::Int32(_))
            | (SlotType::Int64, TargetValue::Int64(_))
            | (SlotType::Double, TargetValue::Double(_))
            | (SlotType::String, TargetValue::Str(_)) => true,
            (SlotType::Repeated { kind, element }, value) => match (kind, value) {
                (CollectionKind::List, TargetValue::List(items))
                | (CollectionKind::Set, TargetValue::Set(items))
                | (CollectionKind::Array, TargetValue::Array(items)) => {
                    items.iter().all(|item| element.accepts(item))
                }
                _ => false,
            },
            (SlotType::Keyed { value: slot }, TargetValue::Map(entries)) => {
                entries.values().all(|v| slot.accepts(v))
            }
            (SlotType::Record(schema), TargetValue::Record(record)) => match schema.source {
                Some(source) => record.schema().source() == Some(source),
                None => true,
            },
            _ => false,
        }
    }

    pub fn name(&self) -> String {
        match self {
            SlotType::Bool => "Bool".to_string(),
            SlotType::Byte => "Byte".to_string(),
            SlotType::Int16 => "Int16".to_string(),
            SlotType::Int32 => "Int32".to_string(),
            SlotType::Int64 => "Int64".to_string(),
            SlotType::Double => "Double".to_string(),
            SlotType::String => "String".to_string(),
            SlotType::Repeated { kind, element } => format!("{:?}<{}>", kind, element.name()),
            SlotType::Keyed { value } => format!("Map<String, {}>", value.name()),
            SlotType::Record(schema) => schema.name.clone(),
            SlotType::Untyped => "Untyped".to_string(),
        }
    }
}

impl fmt::Display for SlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub name: String,
    pub slot_type: SlotType,
}

/// Named structure with typed slots
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedSchema {
    name: String,
    source: Option<TypeRef>,
    slots: Vec<Slot>,
    index: HashMap<String, usize>,
}

impl GeneratedSchema {
    fn build(name: String, source: Option<TypeRef>, slots: Vec<Slot>) -> Self {
        let index = slots
            .iter()
            .enumerate()
            .map(|(position, slot)| (slot.name.clone(), position))
            .collect();
        Self {
            name,
            source,
            slots,
            index,
        }
    }

    /// One slot per field descriptor, same name and order
    pub fn from_descriptor(descriptor: &TypeDescriptor, preference: CollectionPreference) -> Self {
        let slots = descriptor
            .fields()
            .iter()
            .map(|field| Slot {
                name: field.name.clone(),
                slot_type: SlotType::for_field(field, preference),
            })
            .collect();
        Self::build(
            descriptor.name().to_string(),
            Some(descriptor.type_ref()),
            slots,
        )
    }

    /// Schema for the generic fallback record: one untyped slot per observed key
    pub fn generic<I, S>(name: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let slots = keys
            .into_iter()
            .map(|key| Slot {
                name: key.into(),
                slot_type: SlotType::Untyped,
            })
            .collect();
        Self::build(name.into(), None, slots)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The Source type this schema was derived from
    pub fn source(&self) -> Option<TypeRef> {
        self.source
    }

    pub fn is_generic(&self) -> bool {
        self.source.is_none()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot(&self, name: &str) -> Option<&Slot> {
        self.position(name).map(|position| &self.slots[position])
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Concurrent cache of generated schemas keyed by Source type identity
#[derive(Debug, Default)]
pub struct SchemaGenerator {
    entries: DashMap<TypeId, Arc<GeneratedSchema>>,
    preference: CollectionPreference,
}

impl SchemaGenerator {
    pub fn new(preference: CollectionPreference) -> Self {
        Self {
            entries: DashMap::new(),
            preference,
        }
    }

    /// Return the cached schema for `descriptor`, generating it on a miss
    ///
    /// Schemas for nested struct types already present in `registry` are
    /// generated and cached alongside.
    pub fn get_or_create(
        &self,
        descriptor: &TypeDescriptor,
        registry: &DescriptorRegistry,
    ) -> Arc<GeneratedSchema> {
        let key = descriptor.type_ref().id();
        if let Some(found) = self.entries.get(&key) {
            return Arc::clone(found.value());
        }

        let generated = Arc::new(GeneratedSchema::from_descriptor(descriptor, self.preference));
        let schema = Arc::clone(self.entries.entry(key).or_insert(generated).value());
        debug!(
            "Generated schema {} ({} slots)",
            schema.name(),
            schema.len()
        );

        for nested in descriptor.nested_types() {
            if self.entries.contains_key(&nested.id()) {
                continue;
            }
            if let Some(nested_descriptor) = registry.get(nested) {
                self.get_or_create(&nested_descriptor, registry);
            }
        }

        schema
    }

    pub fn get(&self, type_ref: TypeRef) -> Option<Arc<GeneratedSchema>> {
        self.entries
            .get(&type_ref.id())
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn preference(&self) -> CollectionPreference {
        self.preference
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
