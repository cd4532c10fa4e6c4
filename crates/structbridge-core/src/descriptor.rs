//! Type descriptor registry
//!
//! Introspects a Source type once and caches the classified field list,
//! keyed by type identity. Classification uses a fixed table; a field whose
//! declared type falls outside it is recorded as [`TypeTag::Unsupported`] and
//! logged, so unrelated fields of the same type stay usable.
//!
//! Copyright (c) 2025 Structbridge Team
//! Licensed under the Apache-2.0 license

use crate::source::{DeclaredType, FieldDecl, TypeRef};
use crate::{Error, Result};
use dashmap::DashMap;
use log::{debug, warn};
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Classified field type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Bool,
    Byte,
    Int16,
    Int32,
    Int64,
    Double,
    String,
    List,
    Set,
    Map,
    Struct,
    Unsupported,
}

impl TypeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::Bool => "Bool",
            TypeTag::Byte => "Byte",
            TypeTag::Int16 => "Int16",
            TypeTag::Int32 => "Int32",
            TypeTag::Int64 => "Int64",
            TypeTag::Double => "Double",
            TypeTag::String => "String",
            TypeTag::List => "List",
            TypeTag::Set => "Set",
            TypeTag::Map => "Map",
            TypeTag::Struct => "Struct",
            TypeTag::Unsupported => "Unsupported",
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            TypeTag::Bool
                | TypeTag::Byte
                | TypeTag::Int16
                | TypeTag::Int32
                | TypeTag::Int64
                | TypeTag::Double
                | TypeTag::String
        )
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified field of a Source type
///
/// Collection fields carry an element descriptor (`List`, `Set`) or key and
/// value descriptors (`Map`); struct fields carry the nested type when it is
/// known.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub type_tag: TypeTag,
    pub element: Option<Box<FieldDescriptor>>,
    pub key: Option<Box<FieldDescriptor>>,
    pub value: Option<Box<FieldDescriptor>>,
    pub nested_type: Option<TypeRef>,
    pub required: bool,
}

impl FieldDescriptor {
    fn leaf(name: &str, type_tag: TypeTag, required: bool) -> Self {
        Self {
            name: name.to_string(),
            type_tag,
            element: None,
            key: None,
            value: None,
            nested_type: None,
            required,
        }
    }

    fn unsupported(name: &str, required: bool) -> Self {
        Self::leaf(name, TypeTag::Unsupported, required)
    }

    /// Classify a declared type through the fixed mapping table
    fn classify(
        owner: &str,
        name: &str,
        declared: &DeclaredType,
        required: bool,
    ) -> Result<Self> {
        let descriptor = match declared {
            DeclaredType::Bool => Self::leaf(name, TypeTag::Bool, required),
            DeclaredType::Int8 => Self::leaf(name, TypeTag::Byte, required),
            DeclaredType::Int16 => Self::leaf(name, TypeTag::Int16, required),
            DeclaredType::Int32 => Self::leaf(name, TypeTag::Int32, required),
            DeclaredType::Int64 => Self::leaf(name, TypeTag::Int64, required),
            DeclaredType::Float32 | DeclaredType::Float64 => {
                Self::leaf(name, TypeTag::Double, required)
            }
            DeclaredType::Text => Self::leaf(name, TypeTag::String, required),
            DeclaredType::List(element) | DeclaredType::Set(element) => {
                let type_tag = if matches!(declared, DeclaredType::Set(_)) {
                    TypeTag::Set
                } else {
                    TypeTag::List
                };
                Self {
                    element: Some(Box::new(Self::classify(owner, name, element, false)?)),
                    ..Self::leaf(name, type_tag, required)
                }
            }
            DeclaredType::Map(key, value) => Self {
                key: Some(Box::new(Self::classify(owner, name, key, false)?)),
                value: Some(Box::new(Self::classify(owner, name, value, false)?)),
                ..Self::leaf(name, TypeTag::Map, required)
            },
            DeclaredType::Record(nested) => Self {
                nested_type: *nested,
                ..Self::leaf(name, TypeTag::Struct, required)
            },
            DeclaredType::Opaque(type_name) => {
                return Err(Error::TypeMapping {
                    type_name: owner.to_string(),
                    field: name.to_string(),
                    message: format!("declared type '{}' has no type tag", type_name),
                });
            }
        };
        Ok(descriptor)
    }

    /// Nested Source types reachable from this field, including through
    /// collection elements and map values
    fn collect_nested(&self, out: &mut Vec<TypeRef>) {
        if let Some(nested) = self.nested_type {
            if !out.contains(&nested) {
                out.push(nested);
            }
        }
        for child in [&self.element, &self.key, &self.value].into_iter().flatten() {
            child.collect_nested(out);
        }
    }
}

/// Cached metadata describing a Source type's fields
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    type_ref: TypeRef,
    fields: Vec<FieldDescriptor>,
}

impl TypeDescriptor {
    /// Introspect `type_ref` and classify every declared field
    pub fn derive(type_ref: TypeRef) -> Result<Self> {
        let declarations = type_ref.fields();
        let mut seen = HashSet::with_capacity(declarations.len());

        let mut fields = Vec::with_capacity(declarations.len());
        for FieldDecl { name, declared, required } in declarations {
            if name.is_empty() {
                return Err(Error::unsupported(
                    format!("{} declares a field with an empty name", type_ref.name()),
                    Some("field_name"),
                ));
            }
            if !seen.insert(name.clone()) {
                return Err(Error::unsupported(
                    format!("{} declares field '{}' more than once", type_ref.name(), name),
                    Some("field_name"),
                ));
            }

            let descriptor =
                match FieldDescriptor::classify(type_ref.name(), &name, &declared, required) {
                    Ok(descriptor) => descriptor,
                    Err(err) => {
                        warn!("[{}] {}; field left unmapped", err.code(), err);
                        FieldDescriptor::unsupported(&name, required)
                    }
                };
            fields.push(descriptor);
        }

        Ok(Self { type_ref, fields })
    }

    pub fn type_ref(&self) -> TypeRef {
        self.type_ref
    }

    pub fn name(&self) -> &'static str {
        self.type_ref.name()
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn required_count(&self) -> usize {
        self.fields.iter().filter(|f| f.required).count()
    }

    /// Distinct nested Source types referenced by this type's fields
    pub fn nested_types(&self) -> Vec<TypeRef> {
        let mut nested = Vec::new();
        for field in &self.fields {
            field.collect_nested(&mut nested);
        }
        nested
    }
}

/// Concurrent cache of type descriptors keyed by type identity
///
/// Entries never change once inserted. Derivation runs outside the map lock;
/// when two callers race on the same key the first inserted descriptor wins
/// and both observe it.
#[derive(Debug, Default)]
pub struct DescriptorRegistry {
    entries: DashMap<TypeId, Arc<TypeDescriptor>>,
}

impl DescriptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached descriptor for `type_ref`, deriving it on a miss
    ///
    /// The descriptor and every nested struct type it reaches are derived
    /// into a pending set first and published together, so a failing nested
    /// type leaves the cache untouched. Self-referential types terminate on
    /// the pending set.
    pub fn get_or_create(&self, type_ref: TypeRef) -> Result<Arc<TypeDescriptor>> {
        if let Some(found) = self.get(type_ref) {
            return Ok(found);
        }

        let mut pending: HashMap<TypeId, Arc<TypeDescriptor>> = HashMap::new();
        let mut queue = vec![type_ref];
        while let Some(next) = queue.pop() {
            if pending.contains_key(&next.id())
                || (next != type_ref && self.entries.contains_key(&next.id()))
            {
                continue;
            }
            let derived = Arc::new(TypeDescriptor::derive(next)?);
            queue.extend(derived.nested_types());
            pending.insert(next.id(), derived);
        }

        let mut root = None;
        for (id, derived) in pending {
            let stored = Arc::clone(self.entries.entry(id).or_insert(derived).value());
            debug!(
                "Derived type descriptor for {} ({} fields)",
                stored.name(),
                stored.fields().len()
            );
            if id == type_ref.id() {
                root = Some(stored);
            }
        }

        root.ok_or_else(|| {
            Error::transformation(format!("descriptor for {} was not derived", type_ref.name()))
        })
    }

    pub fn get(&self, type_ref: TypeRef) -> Option<Arc<TypeDescriptor>> {
        self.entries
            .get(&type_ref.id())
            .map(|entry| Arc::clone(entry.value()))
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Describable, SourceField, SourceValue};

    #[derive(Debug, Clone, Default)]
    struct Leaf {
        value: String,
    }

    impl Describable for Leaf {
        const TYPE_NAME: &'static str = "test.Leaf";

        fn describe() -> Vec<FieldDecl> {
            vec![FieldDecl::required::<String>("value")]
        }

        fn field(&self, name: &str) -> Option<SourceValue> {
            (name == "value").then(|| SourceValue::Str(self.value.clone()))
        }

        fn set_field(&mut self, _name: &str, value: Option<SourceValue>) -> Result<()> {
            self.value = String::from_source(value)?;
            Ok(())
        }
    }

    #[derive(Debug, Clone, Default)]
    struct Tree {
        children: Vec<Tree>,
    }

    crate::impl_source_field!(Tree);

    impl Describable for Tree {
        const TYPE_NAME: &'static str = "test.Tree";

        fn describe() -> Vec<FieldDecl> {
            vec![
                FieldDecl::optional::<Vec<Tree>>("children"),
                FieldDecl::record::<Leaf>("leaf"),
                FieldDecl::new("handle", DeclaredType::Opaque("FileHandle"), false),
                FieldDecl::optional::<Vec<i64>>("weights"),
            ]
        }

        fn field(&self, name: &str) -> Option<SourceValue> {
            match name {
                "children" => self.children.to_source(),
                _ => None,
            }
        }

        fn set_field(&mut self, name: &str, value: Option<SourceValue>) -> Result<()> {
            if name == "children" {
                self.children = SourceField::from_source(value)?;
            }
            Ok(())
        }
    }

    #[derive(Debug, Clone, Default)]
    struct Duplicated;

    impl Describable for Duplicated {
        const TYPE_NAME: &'static str = "test.Duplicated";

        fn describe() -> Vec<FieldDecl> {
            vec![
                FieldDecl::optional::<i32>("a"),
                FieldDecl::optional::<String>("a"),
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
    fn test_classification_keeps_declaration_order() {
        let registry = DescriptorRegistry::new();
        let descriptor = registry.get_or_create(TypeRef::of::<Tree>()).unwrap();

        let names: Vec<_> = descriptor.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["children", "leaf", "handle", "weights"]);

        let children = descriptor.field("children").unwrap();
        assert_eq!(children.type_tag, TypeTag::List);
        let element = children.element.as_ref().unwrap();
        assert_eq!(element.type_tag, TypeTag::Struct);
        assert_eq!(element.nested_type, Some(TypeRef::of::<Tree>()));

        assert_eq!(descriptor.field("handle").unwrap().type_tag, TypeTag::Unsupported);
        assert_eq!(
            descriptor.field("weights").unwrap().element.as_ref().unwrap().type_tag,
            TypeTag::Int64
        );
    }

    #[test]
    fn test_nested_types_resolved_eagerly() {
        let registry = DescriptorRegistry::new();
        registry.get_or_create(TypeRef::of::<Tree>()).unwrap();

        // self-reference terminates; the leaf record is cached too
        assert_eq!(registry.len(), 2);
        assert!(registry.get(TypeRef::of::<Leaf>()).is_some());
    }

    #[test]
    fn test_cached_descriptor_is_shared() {
        let registry = DescriptorRegistry::new();
        let first = registry.get_or_create(TypeRef::of::<Leaf>()).unwrap();
        let second = registry.get_or_create(TypeRef::of::<Leaf>()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.required_count(), 1);

        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_field_names_rejected() {
        let registry = DescriptorRegistry::new();
        let err = registry.get_or_create(TypeRef::of::<Duplicated>()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation { .. }));
        assert!(registry.is_empty());
    }

    #[derive(Debug, Clone, Default)]
    struct Wrapper;

    impl Describable for Wrapper {
        const TYPE_NAME: &'static str = "test.Wrapper";

        fn describe() -> Vec<FieldDecl> {
            vec![
                FieldDecl::required::<i32>("id"),
                FieldDecl::record::<Duplicated>("inner"),
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
    fn test_failed_nested_derivation_caches_nothing() {
        let registry = DescriptorRegistry::new();
        for _ in 0..2 {
            let err = registry.get_or_create(TypeRef::of::<Wrapper>()).unwrap_err();
            assert!(matches!(err, Error::UnsupportedOperation { .. }));
            assert!(registry.is_empty());
        }
    }
}
