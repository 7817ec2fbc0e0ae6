use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::types::container_type_name::ContainerTypeName;
use crate::types::field_name::FieldName;
use crate::types::logical_type::LogicalTypeName;

/// One declared field of a container type: its name and logical type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: FieldName,
    pub logical_type: LogicalTypeName,
}

impl FieldDefinition {
    pub fn new(name: FieldName, logical_type: LogicalTypeName) -> Self {
        Self { name, logical_type }
    }
}

impl fmt::Display for FieldDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.logical_type)
    }
}

/// A container type's schema: its name and its ordered set of
/// `(field_name, logical_type)` pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub type_name: ContainerTypeName,
    pub fields: Vec<FieldDefinition>,
}

impl SchemaDefinition {
    /// Creates a new `SchemaDefinition`, validating that no field name
    /// repeats.
    pub fn new(
        type_name: ContainerTypeName,
        fields: Vec<FieldDefinition>,
    ) -> Result<Self, StoreError> {
        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(StoreError::Parse {
                    message: format!(
                        "duplicate field name '{}' in schema '{type_name}'",
                        field.name
                    ),
                });
            }
        }
        Ok(Self { type_name, fields })
    }

    /// Looks up a field definition by name.
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name.as_str() == name)
    }

    /// Returns the ordered list of field names.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

impl fmt::Display for SchemaDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {{", self.type_name)?;
        for field in &self.fields {
            writeln!(f, "  {field}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, logical_type: LogicalTypeName) -> FieldDefinition {
        FieldDefinition::new(FieldName::new(name).unwrap(), logical_type)
    }

    #[test]
    fn valid_schema() {
        let schema = SchemaDefinition::new(
            ContainerTypeName::new("test_container").unwrap(),
            vec![field("attribute", LogicalTypeName::str())],
        )
        .unwrap();
        assert_eq!(schema.type_name.as_str(), "test_container");
        assert!(schema.field("attribute").is_some());
        assert!(schema.field("missing").is_none());
    }

    #[test]
    fn duplicate_field_names_rejected() {
        let result = SchemaDefinition::new(
            ContainerTypeName::new("event").unwrap(),
            vec![
                field("name", LogicalTypeName::str()),
                field("name", LogicalTypeName::int()),
            ],
        );
        assert!(result.is_err());
    }

    #[test]
    fn field_names_iterates_in_order() {
        let schema = SchemaDefinition::new(
            ContainerTypeName::new("event").unwrap(),
            vec![
                field("a", LogicalTypeName::str()),
                field("b", LogicalTypeName::int()),
            ],
        )
        .unwrap();
        let names: Vec<&str> = schema.field_names().collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn display_renders_block() {
        let schema = SchemaDefinition::new(
            ContainerTypeName::new("test_container").unwrap(),
            vec![field("attribute", LogicalTypeName::str())],
        )
        .unwrap();
        let s = schema.to_string();
        assert!(s.contains("test_container {"));
        assert!(s.contains("attribute: str"));
    }

    #[test]
    fn serde_roundtrip() {
        let schema = SchemaDefinition::new(
            ContainerTypeName::new("event").unwrap(),
            vec![field("name", LogicalTypeName::str())],
        )
        .unwrap();
        let json = serde_json::to_string(&schema).unwrap();
        let back: SchemaDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(schema, back);
    }
}
