//! Mapper interface
//!
//! [`Mapper`] owns the descriptor registry, the schema cache and the policy,
//! and exposes both mapping directions plus cache management. It is `Send`
//! and `Sync`; share one instance across threads to share its caches.
//!
//! Copyright (c) 2025 Structbridge Team
//! Licensed under the Apache-2.0 license

use crate::descriptor::{DescriptorRegistry, TypeDescriptor};
use crate::forward::ForwardTransformer;
use crate::node::Node;
use crate::policy::MappingPolicy;
use crate::record::DynamicRecord;
use crate::reverse::ReverseTransformer;
use crate::schema::{GeneratedSchema, SchemaGenerator};
use crate::source::{downcast_record, Describable, SourceRecord, TypeRef};
use crate::validator::Validator;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Cache sizes for operational visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub descriptor_count: usize,
    pub schema_count: usize,
}

#[derive(Debug)]
pub struct Mapper {
    policy: MappingPolicy,
    registry: DescriptorRegistry,
    schemas: SchemaGenerator,
}

impl Default for Mapper {
    fn default() -> Self {
        Self::new(MappingPolicy::default())
    }
}

impl Mapper {
    pub fn new(policy: MappingPolicy) -> Self {
        Self {
            registry: DescriptorRegistry::new(),
            schemas: SchemaGenerator::new(policy.collection_preference),
            policy,
        }
    }

    pub fn policy(&self) -> &MappingPolicy {
        &self.policy
    }

    /// Forward-map a Source record into a fresh Target record
    pub fn to_target(&self, source: &dyn SourceRecord) -> Result<DynamicRecord> {
        self.forward().transform(source)
    }

    /// Reverse-map a Target record into a fresh `R`
    pub fn to_source<R: Describable>(&self, target: &DynamicRecord) -> Result<R> {
        downcast_record(self.to_source_dyn(target, TypeRef::of::<R>())?)
    }

    /// Reverse-map a Target record into the Source type named by `type_ref`
    pub fn to_source_dyn(
        &self,
        target: &DynamicRecord,
        type_ref: TypeRef,
    ) -> Result<Box<dyn SourceRecord>> {
        ReverseTransformer::new(&self.registry, &self.policy).transform(target, type_ref)
    }

    /// Whether `target` is likely to reverse-map into `R`
    pub fn validate<R: Describable>(&self, target: &DynamicRecord) -> bool {
        self.validate_type(target, TypeRef::of::<R>())
    }

    pub fn validate_type(&self, target: &DynamicRecord, type_ref: TypeRef) -> bool {
        Validator::new(&self.registry, &self.policy).is_transformable(target, type_ref)
    }

    /// Lower a Source record into the intermediate tree
    ///
    /// Absent fields appear as explicit nulls.
    pub fn source_to_node(&self, source: &dyn SourceRecord) -> Result<Node> {
        self.forward().lower(source)
    }

    /// Build an `R` from an intermediate tree, applying the null policy to
    /// missing and null keys
    pub fn node_to_source<R: Describable>(&self, node: &Node) -> Result<R> {
        let record = ReverseTransformer::new(&self.registry, &self.policy)
            .raise(node, TypeRef::of::<R>())?;
        downcast_record(record)
    }

    pub fn descriptor(&self, type_ref: TypeRef) -> Result<Arc<TypeDescriptor>> {
        self.registry.get_or_create(type_ref)
    }

    pub fn schema_for(&self, type_ref: TypeRef) -> Result<Arc<GeneratedSchema>> {
        let descriptor = self.registry.get_or_create(type_ref)?;
        Ok(self.schemas.get_or_create(&descriptor, &self.registry))
    }

    /// Drop every cached descriptor and schema
    pub fn clear_caches(&self) {
        self.registry.clear();
        self.schemas.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            descriptor_count: self.registry.len(),
            schema_count: self.schemas.len(),
        }
    }

    fn forward(&self) -> ForwardTransformer<'_> {
        ForwardTransformer::new(&self.registry, &self.schemas, &self.policy)
    }
}
