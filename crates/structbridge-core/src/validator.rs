//! Pre-flight check before reverse transformation
//!
//! Strict validation compares the number of set Target slots with the number
//! of required Source fields. It does not check which slots are set.
//!
//! Copyright (c) 2025 Structbridge Team
//! Licensed under the Apache-2.0 license

use crate::descriptor::{DescriptorRegistry, TypeDescriptor};
use crate::policy::MappingPolicy;
use crate::record::DynamicRecord;
use crate::source::TypeRef;
use crate::{Error, Result};
use log::warn;

pub struct Validator<'a> {
    registry: &'a DescriptorRegistry,
    policy: &'a MappingPolicy,
}

impl<'a> Validator<'a> {
    pub fn new(registry: &'a DescriptorRegistry, policy: &'a MappingPolicy) -> Self {
        Self { registry, policy }
    }

    /// Advisory check; always true under lenient validation
    pub fn is_transformable(&self, target: &DynamicRecord, type_ref: TypeRef) -> bool {
        if !self.policy.strict_validation {
            return true;
        }
        match self.registry.get_or_create(type_ref) {
            Ok(descriptor) => self.check(target, &descriptor).is_ok(),
            Err(err) => {
                warn!("Cannot validate against {}: {}", type_ref.name(), err);
                false
            }
        }
    }

    /// Fail with a validation error when strict mode rejects `target`
    pub fn check(&self, target: &DynamicRecord, descriptor: &TypeDescriptor) -> Result<()> {
        if !self.policy.strict_validation {
            return Ok(());
        }

        let set_slots = target.set_count();
        let required_fields = descriptor.required_count();
        if set_slots < required_fields {
            return Err(Error::Validation {
                type_name: descriptor.name().to_string(),
                message: format!(
                    "{} set slots cannot cover {} required fields",
                    set_slots, required_fields
                ),
                set_slots,
                required_fields,
            });
        }
        Ok(())
    }
}
