use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use crate::codec::{
    BoolCodec, IdentifierCodec, IntCodec, LogicalTypeCodec, StrCodec, StrSequenceCodec,
    TimestampCodec,
};
use crate::error::StoreError;
use crate::types::logical_type::builtin;

/// The two serialization methods a logical type is encoded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Json,
    Row,
}

/// Process-wide (or local, for tests) mapping from logical type name to its
/// codec. `DataTypeRegistry::new` pre-populates the built-in set from the
/// schema/data-type registry table; [`DataTypeRegistry::empty`] starts with
/// nothing registered.
pub struct DataTypeRegistry {
    codecs: HashMap<String, Arc<dyn LogicalTypeCodec>>,
}

impl DataTypeRegistry {
    pub fn empty() -> Self {
        Self {
            codecs: HashMap::new(),
        }
    }

    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry
            .register(builtin::BOOL, Arc::new(BoolCodec))
            .expect("builtin registration cannot collide");
        registry
            .register(builtin::INT, Arc::new(IntCodec))
            .expect("builtin registration cannot collide");
        registry
            .register(builtin::STR, Arc::new(StrCodec))
            .expect("builtin registration cannot collide");
        registry
            .register(builtin::TIMESTAMP, Arc::new(TimestampCodec))
            .expect("builtin registration cannot collide");
        registry
            .register(
                builtin::ATTRIBUTE_CONTAINER_IDENTIFIER,
                Arc::new(IdentifierCodec),
            )
            .expect("builtin registration cannot collide");
        registry
            .register(builtin::STR_SEQUENCE, Arc::new(StrSequenceCodec))
            .expect("builtin registration cannot collide");
        registry
    }

    /// Registers `codec` under `logical_type`. Fails with
    /// [`StoreError::AlreadyRegistered`] if that name already has a codec.
    pub fn register(
        &mut self,
        logical_type: impl Into<String>,
        codec: Arc<dyn LogicalTypeCodec>,
    ) -> Result<(), StoreError> {
        let name = logical_type.into();
        if self.codecs.contains_key(&name) {
            return Err(StoreError::AlreadyRegistered { name });
        }
        self.codecs.insert(name, codec);
        Ok(())
    }

    /// Deregisters `logical_type`. Fails with [`StoreError::NotRegistered`]
    /// if it was never registered.
    pub fn deregister(&mut self, logical_type: &str) -> Result<(), StoreError> {
        if self.codecs.remove(logical_type).is_none() {
            return Err(StoreError::NotRegistered {
                name: logical_type.to_string(),
            });
        }
        Ok(())
    }

    pub fn has(&self, logical_type: &str) -> bool {
        self.codecs.contains_key(logical_type)
    }

    /// Returns the codec registered for `logical_type`, or `None` if it is
    /// not registered. `method` is accepted for symmetry with the logical
    /// data model (a codec serves both `json` and `row-column` encodings
    /// from the same object); it does not otherwise change the result.
    pub fn serializer(
        &self,
        logical_type: &str,
        _method: Encoding,
    ) -> Option<&Arc<dyn LogicalTypeCodec>> {
        self.codecs.get(logical_type)
    }
}

impl Default for DataTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide data-type registry singleton, pre-populated with the
/// built-in logical types.
pub fn global() -> &'static Mutex<DataTypeRegistry> {
    static REGISTRY: OnceLock<Mutex<DataTypeRegistry>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(DataTypeRegistry::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_pre_registered() {
        let registry = DataTypeRegistry::new();
        for name in [
            builtin::BOOL,
            builtin::INT,
            builtin::STR,
            builtin::TIMESTAMP,
            builtin::ATTRIBUTE_CONTAINER_IDENTIFIER,
            builtin::STR_SEQUENCE,
        ] {
            assert!(registry.has(name), "expected builtin: {name}");
        }
    }

    #[test]
    fn empty_has_nothing() {
        let registry = DataTypeRegistry::empty();
        assert!(!registry.has(builtin::BOOL));
    }

    #[test]
    fn duplicate_register_fails() {
        let mut registry = DataTypeRegistry::new();
        assert!(matches!(
            registry.register(builtin::BOOL, Arc::new(BoolCodec)),
            Err(StoreError::AlreadyRegistered { .. })
        ));
    }

    #[test]
    fn deregister_then_serializer_is_none() {
        let mut registry = DataTypeRegistry::new();
        registry.deregister(builtin::BOOL).unwrap();
        assert!(registry.serializer(builtin::BOOL, Encoding::Json).is_none());
    }

    #[test]
    fn deregister_unknown_fails() {
        let mut registry = DataTypeRegistry::empty();
        assert!(matches!(
            registry.deregister("nope"),
            Err(StoreError::NotRegistered { .. })
        ));
    }
}
