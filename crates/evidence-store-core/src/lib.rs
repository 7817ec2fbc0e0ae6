//! # evidence-store-core
//!
//! Core types for a typed, schema-driven store of "attribute container"
//! records: the container value type, the container and data-type
//! registries, the built-in logical-type codecs, and the JSON document
//! format shared by every backend.
//!
//! Backends (`evidence-store-backend`, `evidence-store-kv`,
//! `evidence-store-sql`) and the filter-expression crate
//! (`evidence-store-filter`) all build on top of this crate; it has no
//! knowledge of any particular storage engine.

pub mod codec;
pub mod container;
pub mod error;
pub mod json_format;
pub mod registry;
pub mod types;

pub use container::Container;
pub use error::{ErrorKind, StoreError};
pub use types::{
    AttributeValue, ContainerIdentifier, ContainerTypeName, FieldDefinition, FieldName,
    LogicalTypeName, SchemaDefinition,
};
