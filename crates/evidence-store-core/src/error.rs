use std::fmt;

/// Errors raised by the store contract, the registries, and the
/// serialization layer.
///
/// Variants are grouped into the four kinds named by the error handling
/// design: `io`, `parse`, `key`, `value`. The grouping is informative
/// (`kind()`); callers that only care about the kind should match on that
/// rather than on individual variants, since the variant set may grow.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreError {
    /// The store was not open (or not open read-write) for an operation
    /// that required it.
    NotOpen { operation: String },
    /// `open` was called on a store that was already open.
    AlreadyOpen,
    /// `close` was called on a store that was already closed.
    AlreadyClosed,
    /// A backend read or write failed.
    Backend { message: String },
    /// The on-disk format version is incompatible with this release.
    IncompatibleFormat {
        stored_version: i64,
        minimum_readable: i64,
    },
    /// An identifier string was not of the canonical `"<type>.<n>"` shape.
    MalformedIdentifier { text: String },
    /// `update` targeted an identifier that does not exist in the store.
    MissingRecord { type_name: String, sequence_number: u64 },
    /// The transactional table backend was asked to iterate an unknown type.
    UnknownType { type_name: String },
    /// A table (or equivalent per-type storage) already exists.
    TableAlreadyExists { type_name: String },

    /// A definitions file or filter expression was not well-formed.
    Parse { message: String },

    /// A registry insert targeted a name that is already registered.
    AlreadyRegistered { name: String },
    /// A registry delete or lookup targeted a name that is not registered.
    NotRegistered { name: String },

    /// A required argument was missing (e.g. a path for a persistent
    /// backend).
    MissingArgument { argument: String },
    /// A schema referenced a logical type that is not registered.
    UnknownLogicalType { logical_type: String },
}

/// The four error kinds named by the error handling design.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Parse,
    Key,
    Value,
}

impl StoreError {
    /// Returns which of the four error kinds this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotOpen { .. }
            | Self::AlreadyOpen
            | Self::AlreadyClosed
            | Self::Backend { .. }
            | Self::IncompatibleFormat { .. }
            | Self::MalformedIdentifier { .. }
            | Self::MissingRecord { .. }
            | Self::UnknownType { .. }
            | Self::TableAlreadyExists { .. } => ErrorKind::Io,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::AlreadyRegistered { .. } | Self::NotRegistered { .. } => ErrorKind::Key,
            Self::MissingArgument { .. } | Self::UnknownLogicalType { .. } => ErrorKind::Value,
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotOpen { operation } => {
                write!(f, "unable to {operation}: store is not open")
            }
            Self::AlreadyOpen => write!(f, "store is already open"),
            Self::AlreadyClosed => write!(f, "store is already closed"),
            Self::Backend { message } => write!(f, "backend error: {message}"),
            Self::IncompatibleFormat {
                stored_version,
                minimum_readable,
            } => {
                write!(
                    f,
                    "incompatible format version {stored_version}: this release requires at least {minimum_readable}"
                )
            }
            Self::MalformedIdentifier { text } => {
                write!(f, "malformed identifier '{text}': expected '<type>.<n>'")
            }
            Self::MissingRecord {
                type_name,
                sequence_number,
            } => {
                write!(
                    f,
                    "no record '{type_name}.{sequence_number}' to update"
                )
            }
            Self::UnknownType { type_name } => {
                write!(f, "unknown container type '{type_name}'")
            }
            Self::TableAlreadyExists { type_name } => {
                write!(f, "table for type '{type_name}' already exists")
            }
            Self::Parse { message } => write!(f, "parse error: {message}"),
            Self::AlreadyRegistered { name } => {
                write!(f, "'{name}' is already registered")
            }
            Self::NotRegistered { name } => {
                write!(f, "'{name}' is not registered")
            }
            Self::MissingArgument { argument } => {
                write!(f, "missing required argument '{argument}'")
            }
            Self::UnknownLogicalType { logical_type } => {
                write!(f, "unknown logical type '{logical_type}'")
            }
        }
    }
}

impl std::error::Error for StoreError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_grouping() {
        assert_eq!(StoreError::AlreadyClosed.kind(), ErrorKind::Io);
        assert_eq!(
            StoreError::Parse {
                message: "x".into()
            }
            .kind(),
            ErrorKind::Parse
        );
        assert_eq!(
            StoreError::AlreadyRegistered { name: "x".into() }.kind(),
            ErrorKind::Key
        );
        assert_eq!(
            StoreError::MissingArgument {
                argument: "path".into()
            }
            .kind(),
            ErrorKind::Value
        );
    }

    #[test]
    fn display_messages() {
        let cases = vec![
            (
                StoreError::NotOpen {
                    operation: "read".into(),
                },
                "unable to read",
            ),
            (StoreError::AlreadyOpen, "already open"),
            (StoreError::AlreadyClosed, "already closed"),
            (
                StoreError::MissingRecord {
                    type_name: "test_container".into(),
                    sequence_number: 5,
                },
                "test_container.5",
            ),
            (
                StoreError::UnknownType {
                    type_name: "bogus".into(),
                },
                "bogus",
            ),
        ];
        for (error, needle) in cases {
            let msg = error.to_string();
            assert!(msg.contains(needle), "'{msg}' should contain '{needle}'");
        }
    }

    #[test]
    fn error_is_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(StoreError::AlreadyClosed);
        assert!(err.to_string().contains("already closed"));
    }
}
