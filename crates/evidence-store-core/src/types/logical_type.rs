use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// The name of a registered logical type, e.g. `"bool"`, `"int"`, `"str"`,
/// `"timestamp"`, `"AttributeContainerIdentifier"`, or an extended schema's
/// `"sequence<str>"`. Validated only for non-emptiness and the absence of
/// whitespace; the data-type registry, not this type, decides which names
/// are actually usable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LogicalTypeName(String);

/// Built-in logical type names, per the schema/data-type registry table.
pub mod builtin {
    pub const BOOL: &str = "bool";
    pub const INT: &str = "int";
    pub const STR: &str = "str";
    pub const TIMESTAMP: &str = "timestamp";
    pub const ATTRIBUTE_CONTAINER_IDENTIFIER: &str = "AttributeContainerIdentifier";
    pub const STR_SEQUENCE: &str = "sequence<str>";
}

impl LogicalTypeName {
    pub fn new(s: impl Into<String>) -> Result<Self, StoreError> {
        let s = s.into();
        if s.is_empty() || s.chars().any(char::is_whitespace) {
            return Err(StoreError::Parse {
                message: format!("invalid logical type name '{s}'"),
            });
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn bool() -> Self {
        Self(builtin::BOOL.to_string())
    }

    pub fn int() -> Self {
        Self(builtin::INT.to_string())
    }

    pub fn str() -> Self {
        Self(builtin::STR.to_string())
    }

    pub fn timestamp() -> Self {
        Self(builtin::TIMESTAMP.to_string())
    }

    pub fn identifier() -> Self {
        Self(builtin::ATTRIBUTE_CONTAINER_IDENTIFIER.to_string())
    }

    pub fn str_sequence() -> Self {
        Self(builtin::STR_SEQUENCE.to_string())
    }
}

impl fmt::Display for LogicalTypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<LogicalTypeName> for String {
    fn from(t: LogicalTypeName) -> String {
        t.0
    }
}

impl TryFrom<String> for LogicalTypeName {
    type Error = StoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl AsRef<str> for LogicalTypeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_constructors_match_table() {
        assert_eq!(LogicalTypeName::bool().as_str(), "bool");
        assert_eq!(LogicalTypeName::int().as_str(), "int");
        assert_eq!(LogicalTypeName::str().as_str(), "str");
        assert_eq!(LogicalTypeName::timestamp().as_str(), "timestamp");
        assert_eq!(
            LogicalTypeName::identifier().as_str(),
            "AttributeContainerIdentifier"
        );
    }

    #[test]
    fn rejects_empty_and_whitespace() {
        assert!(LogicalTypeName::new("").is_err());
        assert!(LogicalTypeName::new("has space").is_err());
    }

    #[test]
    fn serde_roundtrip() {
        let t = LogicalTypeName::str();
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "\"str\"");
    }
}
