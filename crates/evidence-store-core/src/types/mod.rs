pub mod container_type_name;
pub mod field_name;
pub mod identifier;
pub mod logical_type;
pub mod schema;
pub mod value;

pub use container_type_name::ContainerTypeName;
pub use field_name::FieldName;
pub use identifier::ContainerIdentifier;
pub use logical_type::LogicalTypeName;
pub use schema::{FieldDefinition, SchemaDefinition};
pub use value::AttributeValue;
