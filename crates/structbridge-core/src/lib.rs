//! Structbridge Core - bidirectional schema-driven object mapping
//!
//! This crate converts strongly typed Source records into dynamically typed
//! Target records and back, pivoting every value through an intermediate
//! tree so the two object models never copy fields directly.
//!
//! # Main Components
//!
//! - **Intermediate Tree**: [`Node`], the canonical pivot value
//! - **Type Descriptor Registry**: cached, classified field lists per Source type
//! - **Schema Generator**: cached Target schemas derived from descriptors
//! - **Forward / Reverse Transformers**: the two mapping directions
//! - **Policy Engine**: null handling, collection preference, strict validation
//! - **Validator**: pre-flight check before reverse mapping
//!
//! # Example
//!
//! ```
//! use structbridge_core::{
//!     Describable, FieldDecl, Mapper, Result, SourceField, SourceValue,
//! };
//!
//! #[derive(Debug, Clone, Default, PartialEq)]
//! struct Account {
//!     id: i32,
//!     owner: Option<String>,
//! }
//!
//! impl Describable for Account {
//!     const TYPE_NAME: &'static str = "example.Account";
//!
//!     fn describe() -> Vec<FieldDecl> {
//!         vec![
//!             FieldDecl::required::<i32>("id"),
//!             FieldDecl::optional::<Option<String>>("owner"),
//!         ]
//!     }
//!
//!     fn field(&self, name: &str) -> Option<SourceValue> {
//!         match name {
//!             "id" => self.id.to_source(),
//!             "owner" => self.owner.to_source(),
//!             _ => None,
//!         }
//!     }
//!
//!     fn set_field(&mut self, name: &str, value: Option<SourceValue>) -> Result<()> {
//!         match name {
//!             "id" => self.id = SourceField::from_source(value)?,
//!             "owner" => self.owner = SourceField::from_source(value)?,
//!             _ => {}
//!         }
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<()> {
//!     let mapper = Mapper::default();
//!     let account = Account { id: 7, owner: Some("ada".into()) };
//!
//!     let target = mapper.to_target(&account)?;
//!     assert_eq!(mapper.to_source::<Account>(&target)?, account);
//!     Ok(())
//! }
//! ```

pub mod coerce;
pub mod descriptor;
pub mod error;
pub mod forward;
pub mod mapper;
pub mod node;
pub mod policy;
pub mod record;
pub mod reverse;
pub mod schema;
pub mod source;
pub mod validator;

// Re-export main types for convenience
pub use error::{Error, ErrorCode, Result};
pub use descriptor::{DescriptorRegistry, FieldDescriptor, TypeDescriptor, TypeTag};
pub use mapper::{CacheStats, Mapper};
pub use node::Node;
pub use policy::{CollectionPreference, MappingPolicy, NullHandling, NullOutcome};
pub use record::{DynamicRecord, TargetValue};
pub use schema::{CollectionKind, GeneratedSchema, SchemaGenerator, SchemaRef, Slot, SlotType};
pub use source::{
    downcast_record, record_from_value, record_value, DeclaredType, Describable, FieldDecl,
    SourceField, SourceRecord, SourceValue, TypeRef,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
