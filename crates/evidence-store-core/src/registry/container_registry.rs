use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use crate::container::Container;
use crate::error::StoreError;
use crate::types::SchemaDefinition;

/// Process-wide mapping from container type name to its schema.
///
/// `ContainerRegistry::new` builds a local, empty instance suitable for
/// tests or for threading through a store constructor as an injected
/// dependency, per the recommendation against process-global mutable state
/// being the only way to use this type. [`global`] exposes the actual
/// process-wide singleton for callers that want process-wide registration
/// semantics (e.g. a definitions-file loader populating it once at startup).
#[derive(Debug, Default)]
pub struct ContainerRegistry {
    schemas: HashMap<String, Arc<SchemaDefinition>>,
}

impl ContainerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `schema`. Fails with [`StoreError::AlreadyRegistered`] if
    /// the type name is already present.
    pub fn register(&mut self, schema: SchemaDefinition) -> Result<(), StoreError> {
        let name = schema.type_name.as_str().to_string();
        if self.schemas.contains_key(&name) {
            return Err(StoreError::AlreadyRegistered { name });
        }
        tracing::debug!(type_name = %name, "registered container schema");
        self.schemas.insert(name, Arc::new(schema));
        Ok(())
    }

    /// Deregisters the type named `name`. Fails with
    /// [`StoreError::NotRegistered`] if it was never registered.
    pub fn deregister(&mut self, name: &str) -> Result<(), StoreError> {
        if self.schemas.remove(name).is_none() {
            return Err(StoreError::NotRegistered {
                name: name.to_string(),
            });
        }
        tracing::debug!(type_name = %name, "deregistered container schema");
        Ok(())
    }

    /// Creates a fresh container of type `name` with every field absent.
    pub fn create(&self, name: &str) -> Result<Container, StoreError> {
        let schema = self.lookup(name)?;
        Ok(Container::new(schema))
    }

    /// Returns the declared schema for `name`.
    pub fn schema(&self, name: &str) -> Result<Arc<SchemaDefinition>, StoreError> {
        self.lookup(name)
    }

    /// Enumerates all registered type names, in unspecified order.
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    fn lookup(&self, name: &str) -> Result<Arc<SchemaDefinition>, StoreError> {
        self.schemas
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotRegistered {
                name: name.to_string(),
            })
    }
}

/// The process-wide container registry singleton.
pub fn global() -> &'static Mutex<ContainerRegistry> {
    static REGISTRY: OnceLock<Mutex<ContainerRegistry>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(ContainerRegistry::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContainerTypeName, FieldDefinition, FieldName, LogicalTypeName};

    fn test_schema() -> SchemaDefinition {
        SchemaDefinition::new(
            ContainerTypeName::new("test_container").unwrap(),
            vec![FieldDefinition::new(
                FieldName::new("attribute").unwrap(),
                LogicalTypeName::str(),
            )],
        )
        .unwrap()
    }

    #[test]
    fn register_then_create() {
        let mut registry = ContainerRegistry::new();
        registry.register(test_schema()).unwrap();
        let container = registry.create("test_container").unwrap();
        assert_eq!(container.type_name(), "test_container");
    }

    #[test]
    fn duplicate_register_fails() {
        let mut registry = ContainerRegistry::new();
        registry.register(test_schema()).unwrap();
        assert!(matches!(
            registry.register(test_schema()),
            Err(StoreError::AlreadyRegistered { .. })
        ));
    }

    #[test]
    fn deregister_unknown_fails() {
        let mut registry = ContainerRegistry::new();
        assert!(matches!(
            registry.deregister("nope"),
            Err(StoreError::NotRegistered { .. })
        ));
    }

    #[test]
    fn create_unknown_fails() {
        let registry = ContainerRegistry::new();
        assert!(registry.create("nope").is_err());
    }

    #[test]
    fn types_enumerates_registered_names() {
        let mut registry = ContainerRegistry::new();
        registry.register(test_schema()).unwrap();
        let types: Vec<&str> = registry.types().collect();
        assert_eq!(types, vec!["test_container"]);
    }

    #[test]
    fn deregister_then_create_fails() {
        let mut registry = ContainerRegistry::new();
        registry.register(test_schema()).unwrap();
        registry.deregister("test_container").unwrap();
        assert!(registry.create("test_container").is_err());
    }
}
