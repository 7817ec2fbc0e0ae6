use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// A validated container type name matching `[a-z][a-z0-9_]*`.
///
/// Dots are rejected even though they are otherwise valid in a snake_case
/// identifier: the ordered-KV backend packs `(type_name, sequence_number)`
/// into a single key as `"<type_name>.<n>"`, and a dot inside a type name
/// would let one type's keys alias a range scan over another (see the open
/// question on KV key layout). Forbidding the separator character in type
/// names closes that hole without needing a length-prefixed key scheme.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContainerTypeName(String);

impl ContainerTypeName {
    /// Creates a new `ContainerTypeName`, validating snake_case format and
    /// rejecting dots.
    pub fn new(s: impl Into<String>) -> Result<Self, StoreError> {
        let s = s.into();
        if !is_valid(&s) {
            return Err(StoreError::Parse {
                message: format!(
                    "invalid container type name '{s}': must match [a-z][a-z0-9_]* with no dots"
                ),
            });
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_valid(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

impl fmt::Display for ContainerTypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ContainerTypeName> for String {
    fn from(n: ContainerTypeName) -> String {
        n.0
    }
}

impl TryFrom<String> for ContainerTypeName {
    type Error = StoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl AsRef<str> for ContainerTypeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        for name in ["test_container", "event", "a", "x_1"] {
            assert!(ContainerTypeName::new(name).is_ok(), "expected valid: {name}");
        }
    }

    #[test]
    fn rejects_dots() {
        assert!(ContainerTypeName::new("foo.bar").is_err());
    }

    #[test]
    fn invalid_names() {
        for name in ["", "Test", "1test", "-test", "has space"] {
            assert!(ContainerTypeName::new(name).is_err(), "expected invalid: {name}");
        }
    }

    #[test]
    fn display_roundtrip() {
        let name = ContainerTypeName::new("test_container").unwrap();
        assert_eq!(name.to_string(), "test_container");
    }

    #[test]
    fn serde_roundtrip() {
        let name = ContainerTypeName::new("test_container").unwrap();
        let json = serde_json::to_string(&name).unwrap();
        let back: ContainerTypeName = serde_json::from_str(&json).unwrap();
        assert_eq!(name, back);
    }
}
