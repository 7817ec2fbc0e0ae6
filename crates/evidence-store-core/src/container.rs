use std::fmt;
use std::sync::Arc;

use crate::error::StoreError;
use crate::types::{AttributeValue, ContainerIdentifier, SchemaDefinition};

/// A mutable record: a type name, an identifier (absent until inserted), and
/// one value per schema field.
///
/// Two containers of the same type with the same field values are
/// semantically equal (see [`Container::equals`]); the identifier is not
/// part of equality, matching the data model invariant that mutating a
/// container's identifier never changes what it "is".
#[derive(Debug, Clone)]
pub struct Container {
    schema: Arc<SchemaDefinition>,
    identifier: Option<ContainerIdentifier>,
    values: Vec<AttributeValue>,
}

impl Container {
    /// Creates a fresh container for `schema` with every field initialised
    /// to the absent value, per the container registry's `create` contract.
    pub fn new(schema: Arc<SchemaDefinition>) -> Self {
        let values = vec![AttributeValue::Absent; schema.fields.len()];
        Self {
            schema,
            identifier: None,
            values,
        }
    }

    pub fn type_name(&self) -> &str {
        self.schema.type_name.as_str()
    }

    pub fn schema(&self) -> &Arc<SchemaDefinition> {
        &self.schema
    }

    pub fn identifier(&self) -> Option<&ContainerIdentifier> {
        self.identifier.as_ref()
    }

    /// Sets this container's identifier. Per the data model invariant, a
    /// container acquires exactly one identifier (at insert time) which
    /// never changes afterward; callers within this crate family only call
    /// this once, but nothing below this layer re-enforces that beyond
    /// documenting it.
    pub fn set_identifier(&mut self, identifier: ContainerIdentifier) {
        self.identifier = Some(identifier);
    }

    /// The declared field names, in schema order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.schema.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the value of `field`, or `None` if `field` is not declared on
    /// this container's schema (distinct from the field being declared but
    /// absent, which is `Some(&AttributeValue::Absent)`).
    pub fn get(&self, field: &str) -> Option<&AttributeValue> {
        let index = self.field_index(field)?;
        Some(&self.values[index])
    }

    /// Sets the value of `field`. Fails with [`StoreError::NotRegistered`]
    /// if `field` is not declared on this container's schema.
    pub fn set(&mut self, field: &str, value: AttributeValue) -> Result<(), StoreError> {
        let index = self
            .field_index(field)
            .ok_or_else(|| StoreError::NotRegistered {
                name: field.to_string(),
            })?;
        self.values[index] = value;
        Ok(())
    }

    fn field_index(&self, field: &str) -> Option<usize> {
        self.schema.fields.iter().position(|f| f.name.as_str() == field)
    }

    /// `(name, value)` pairs in schema order, skipping fields whose value is
    /// absent.
    pub fn field_values(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.schema
            .fields
            .iter()
            .zip(self.values.iter())
            .filter(|(_, v)| !v.is_absent())
            .map(|(f, v)| (f.name.as_str(), v))
    }

    /// Structural equality: same type name and same field values.
    /// Identifier is intentionally excluded.
    pub fn equals(&self, other: &Container) -> bool {
        self.type_name() == other.type_name() && self.values == other.values
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())?;
        if let Some(id) = &self.identifier {
            write!(f, "[{id}]")?;
        }
        Ok(())
    }
}
