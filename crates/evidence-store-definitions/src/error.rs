use std::fmt;

/// A specific way a YAML attribute container definition failed validation,
/// mirroring the distinct `errors.ParseError` messages raised by the
/// original Python definitions-file reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionsError {
    /// The YAML document could not be parsed at all.
    Malformed { message: String },
    /// A top-level document was empty or not a mapping.
    EmptyDefinition,
    /// A definition carried a key other than `name` or `attributes`.
    UnsupportedKey { container_name: String, key: String },
    /// A definition had no (or an empty) `name`.
    MissingName,
    /// A definition's `attributes` list was absent or empty.
    MissingAttributes { container_name: String },
    /// An attribute entry had no (or an empty) `name`.
    MissingAttributeName { container_name: String, index: usize },
    /// Two attributes in the same definition declared the same name.
    DuplicateAttribute { container_name: String, attribute_name: String },
    /// An attribute had no (or an empty) `type`.
    MissingAttributeType { container_name: String, attribute_name: String },
    /// An attribute's `type` is not one of the definitions loader's
    /// supported data types.
    UnsupportedDataType {
        container_name: String,
        attribute_name: String,
        data_type: String,
    },
    /// The validated name or field name did not satisfy the core crate's
    /// own naming rules (e.g. not snake_case).
    InvalidIdentifier { message: String },
}

impl fmt::Display for DefinitionsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed { message } => write!(f, "malformed definitions document: {message}"),
            Self::EmptyDefinition => write!(f, "missing attribute container definition values"),
            Self::UnsupportedKey { container_name, key } => {
                if container_name.is_empty() {
                    write!(f, "undefined key: {key}")
                } else {
                    write!(f, "{container_name}: undefined key: {key}")
                }
            }
            Self::MissingName => {
                write!(f, "invalid attribute container definition missing name")
            }
            Self::MissingAttributes { container_name } => {
                write!(f, "invalid attribute container definition: {container_name} missing attributes")
            }
            Self::MissingAttributeName { container_name, index } => {
                write!(
                    f,
                    "invalid attribute container definition: {container_name} name missing of attribute: {index}"
                )
            }
            Self::DuplicateAttribute { container_name, attribute_name } => {
                write!(
                    f,
                    "invalid attribute container definition: {container_name} attribute: {attribute_name} already set"
                )
            }
            Self::MissingAttributeType { container_name, attribute_name } => {
                write!(
                    f,
                    "invalid attribute container definition: {container_name} type missing of attribute: {attribute_name}"
                )
            }
            Self::UnsupportedDataType {
                container_name,
                attribute_name,
                data_type,
            } => write!(
                f,
                "invalid attribute container definition: {container_name} type attribute: {attribute_name} unsupported data type: {data_type}"
            ),
            Self::InvalidIdentifier { message } => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for DefinitionsError {}

impl From<evidence_store_core::StoreError> for DefinitionsError {
    fn from(err: evidence_store_core::StoreError) -> Self {
        Self::InvalidIdentifier { message: err.to_string() }
    }
}
