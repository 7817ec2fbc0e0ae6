use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::types::container_type_name::ContainerTypeName;

/// Opaque handle to a stored attribute container: a `(type_name,
/// sequence_number)` pair. Canonical string form is `"<type_name>.<n>"`.
///
/// Sequence numbers are 1-based; `parse(format(x)) == x` for any identifier
/// (this is exercised directly by a proptest below).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContainerIdentifier {
    type_name: ContainerTypeName,
    sequence_number: u64,
}

impl ContainerIdentifier {
    /// Creates a new identifier. `sequence_number` must be >= 1.
    pub fn new(type_name: ContainerTypeName, sequence_number: u64) -> Result<Self, StoreError> {
        if sequence_number == 0 {
            return Err(StoreError::MalformedIdentifier {
                text: format!("{type_name}.0"),
            });
        }
        Ok(Self {
            type_name,
            sequence_number,
        })
    }

    pub fn type_name(&self) -> &ContainerTypeName {
        &self.type_name
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    /// Zero-based index addressed by this identifier (sequence_number - 1).
    pub fn index(&self) -> u64 {
        self.sequence_number - 1
    }

    /// Parses the canonical `"<type>.<n>"` form.
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        let malformed = || StoreError::MalformedIdentifier { text: s.to_string() };

        let (type_part, seq_part) = s.rsplit_once('.').ok_or_else(malformed)?;
        let sequence_number: u64 = seq_part.parse().map_err(|_| malformed())?;
        if sequence_number == 0 {
            return Err(malformed());
        }
        let type_name = ContainerTypeName::new(type_part).map_err(|_| malformed())?;
        Ok(Self {
            type_name,
            sequence_number,
        })
    }

    /// Renders the canonical `"<type>.<n>"` form.
    pub fn to_canonical_string(&self) -> String {
        format!("{}.{}", self.type_name, self.sequence_number)
    }
}

impl fmt::Display for ContainerIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl From<ContainerIdentifier> for String {
    fn from(id: ContainerIdentifier) -> String {
        id.to_canonical_string()
    }
}

impl TryFrom<String> for ContainerIdentifier {
    type Error = StoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tn(s: &str) -> ContainerTypeName {
        ContainerTypeName::new(s).unwrap()
    }

    #[test]
    fn canonical_form() {
        let id = ContainerIdentifier::new(tn("test_container"), 1).unwrap();
        assert_eq!(id.to_canonical_string(), "test_container.1");
        assert_eq!(id.to_string(), "test_container.1");
    }

    #[test]
    fn zero_based_index() {
        let id = ContainerIdentifier::new(tn("event"), 3).unwrap();
        assert_eq!(id.index(), 2);
    }

    #[test]
    fn rejects_zero_sequence_number() {
        assert!(ContainerIdentifier::new(tn("event"), 0).is_err());
    }

    #[test]
    fn round_trip() {
        let id = ContainerIdentifier::new(tn("test_container"), 42).unwrap();
        let parsed = ContainerIdentifier::parse(&id.to_canonical_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn parse_rejects_malformed() {
        for bad in ["no_dot", "test_container.0", "test_container.abc", ".5", ""] {
            assert!(ContainerIdentifier::parse(bad).is_err(), "expected err: {bad}");
        }
    }

    #[test]
    fn serde_roundtrip() {
        let id = ContainerIdentifier::new(tn("test_container"), 7).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"test_container.7\"");
        let back: ContainerIdentifier = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    proptest::proptest! {
        #[test]
        fn parse_format_round_trip(
            type_name in "[a-z][a-z0-9_]{0,15}",
            sequence_number in 1u64..1_000_000,
        ) {
            let id = ContainerIdentifier::new(ContainerTypeName::new(type_name).unwrap(), sequence_number).unwrap();
            let parsed = ContainerIdentifier::parse(&id.to_canonical_string()).unwrap();
            proptest::prop_assert_eq!(id, parsed);
        }
    }
}
