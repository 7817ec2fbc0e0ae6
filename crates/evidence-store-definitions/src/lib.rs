//! # evidence-store-definitions
//!
//! A YAML definitions-file loader: reads one or more attribute-container
//! schema definitions from a multi-document YAML stream and validates them
//! against the narrower data-type set available to definitions-sourced
//! schemas (`AttributeContainerIdentifier`, `bool`, `int`, `str`,
//! `timestamp` — not the extended `sequence<str>` type, which is reachable
//! only by registering a schema directly through the container registry).
//!
//! A definitions file looks like:
//!
//! ```yaml
//! name: windows_eventlog_message_file
//! attributes:
//! - name: path
//!   type: str
//! - name: windows_path
//!   type: str
//! ```

pub mod error;

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use evidence_store_core::{ContainerTypeName, FieldDefinition, FieldName, LogicalTypeName, SchemaDefinition};

pub use error::DefinitionsError;

/// The data types a YAML definitions file may declare an attribute as.
/// Deliberately narrower than the full logical-type set registered in
/// `DataTypeRegistry::new` (no `sequence<str>`).
const SUPPORTED_DATA_TYPES: &[&str] = &["AttributeContainerIdentifier", "bool", "int", "str", "timestamp"];

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDefinition {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    attributes: Option<Vec<RawAttribute>>,
}

#[derive(Debug, Deserialize)]
struct RawAttribute {
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type", default)]
    data_type: Option<String>,
}

/// Reads every definition from the YAML file at `path`.
pub fn read_file(path: impl AsRef<Path>) -> Result<Vec<SchemaDefinition>, DefinitionsError> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "reading definitions file");
    let text = std::fs::read_to_string(path).map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "failed to read definitions file");
        DefinitionsError::Malformed { message: e.to_string() }
    })?;
    read_str(&text)
}

/// Reads every definition from a multi-document YAML string, equivalent to
/// `yaml.safe_load_all` over the whole stream.
pub fn read_str(yaml: &str) -> Result<Vec<SchemaDefinition>, DefinitionsError> {
    let mut schemas = Vec::new();
    for document in serde_yaml::Deserializer::from_str(yaml) {
        let value = serde_yaml::Value::deserialize(document)
            .map_err(|e| DefinitionsError::Malformed { message: e.to_string() })?;
        let is_empty = matches!(value, serde_yaml::Value::Null)
            || value.as_mapping().map(serde_yaml::Mapping::is_empty).unwrap_or(false);
        if is_empty {
            return Err(DefinitionsError::EmptyDefinition);
        }
        let raw: RawDefinition = serde_yaml::from_value(value).map_err(definition_error_from_serde)?;
        schemas.push(parse_definition(raw)?);
    }
    tracing::debug!(count = schemas.len(), "parsed definitions");
    Ok(schemas)
}

fn definition_error_from_serde(err: serde_yaml::Error) -> DefinitionsError {
    let message = err.to_string();
    if message.contains("unknown field") {
        let key = message
            .split('`')
            .nth(1)
            .unwrap_or("?")
            .to_string();
        DefinitionsError::UnsupportedKey {
            container_name: String::new(),
            key,
        }
    } else {
        DefinitionsError::Malformed { message }
    }
}

fn parse_definition(raw: RawDefinition) -> Result<SchemaDefinition, DefinitionsError> {
    let name = raw
        .name
        .filter(|s| !s.is_empty())
        .ok_or(DefinitionsError::MissingName)?;

    let attributes = raw
        .attributes
        .filter(|a| !a.is_empty())
        .ok_or_else(|| DefinitionsError::MissingAttributes {
            container_name: name.clone(),
        })?;

    let type_name = ContainerTypeName::new(name.clone())?;
    let mut seen = HashSet::with_capacity(attributes.len());
    let mut fields = Vec::with_capacity(attributes.len());

    for (index, attribute) in attributes.into_iter().enumerate() {
        let attribute_name = attribute
            .name
            .filter(|s| !s.is_empty())
            .ok_or_else(|| DefinitionsError::MissingAttributeName {
                container_name: name.clone(),
                index,
            })?;

        if !seen.insert(attribute_name.clone()) {
            return Err(DefinitionsError::DuplicateAttribute {
                container_name: name.clone(),
                attribute_name,
            });
        }

        let data_type = attribute
            .data_type
            .filter(|s| !s.is_empty())
            .ok_or_else(|| DefinitionsError::MissingAttributeType {
                container_name: name.clone(),
                attribute_name: attribute_name.clone(),
            })?;

        if !SUPPORTED_DATA_TYPES.contains(&data_type.as_str()) {
            return Err(DefinitionsError::UnsupportedDataType {
                container_name: name.clone(),
                attribute_name,
                data_type,
            });
        }

        fields.push(FieldDefinition::new(
            FieldName::new(attribute_name)?,
            LogicalTypeName::new(data_type)?,
        ));
    }

    Ok(SchemaDefinition::new(type_name, fields)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_a_single_definition() {
        let yaml = "name: windows_eventlog_message_file\nattributes:\n- name: path\n  type: str\n- name: windows_path\n  type: str\n";
        let schemas = read_str(yaml).unwrap();
        assert_eq!(schemas.len(), 1);
        assert_eq!(schemas[0].type_name.as_str(), "windows_eventlog_message_file");
        assert_eq!(schemas[0].fields.len(), 2);
    }

    #[test]
    fn reads_multiple_documents() {
        let yaml = "name: event\nattributes:\n- name: name\n  type: str\n---\nname: message\nattributes:\n- name: text\n  type: str\n";
        let schemas = read_str(yaml).unwrap();
        assert_eq!(schemas.len(), 2);
    }

    #[test]
    fn rejects_an_empty_document() {
        assert_eq!(read_str("null").unwrap_err(), DefinitionsError::EmptyDefinition);
    }

    #[test]
    fn an_empty_file_yields_no_definitions() {
        assert_eq!(read_str("").unwrap(), Vec::new());
    }

    #[test]
    fn rejects_missing_name() {
        let yaml = "attributes:\n- name: path\n  type: str\n";
        assert_eq!(read_str(yaml).unwrap_err(), DefinitionsError::MissingName);
    }

    #[test]
    fn rejects_missing_attributes() {
        let yaml = "name: event\n";
        assert!(matches!(
            read_str(yaml).unwrap_err(),
            DefinitionsError::MissingAttributes { .. }
        ));
    }

    #[test]
    fn rejects_empty_attributes_list() {
        let yaml = "name: event\nattributes: []\n";
        assert!(matches!(
            read_str(yaml).unwrap_err(),
            DefinitionsError::MissingAttributes { .. }
        ));
    }

    #[test]
    fn rejects_duplicate_attribute_names() {
        let yaml = "name: event\nattributes:\n- name: path\n  type: str\n- name: path\n  type: int\n";
        assert!(matches!(
            read_str(yaml).unwrap_err(),
            DefinitionsError::DuplicateAttribute { .. }
        ));
    }

    #[test]
    fn rejects_missing_attribute_name() {
        let yaml = "name: event\nattributes:\n- type: str\n";
        assert!(matches!(
            read_str(yaml).unwrap_err(),
            DefinitionsError::MissingAttributeName { .. }
        ));
    }

    #[test]
    fn rejects_missing_attribute_type() {
        let yaml = "name: event\nattributes:\n- name: path\n";
        assert!(matches!(
            read_str(yaml).unwrap_err(),
            DefinitionsError::MissingAttributeType { .. }
        ));
    }

    #[test]
    fn rejects_unsupported_data_type() {
        let yaml = "name: event\nattributes:\n- name: tags\n  type: sequence<str>\n";
        assert!(matches!(
            read_str(yaml).unwrap_err(),
            DefinitionsError::UnsupportedDataType { .. }
        ));
    }

    #[test]
    fn rejects_unsupported_top_level_key() {
        let yaml = "name: event\nattributes:\n- name: path\n  type: str\nbogus: true\n";
        assert!(matches!(
            read_str(yaml).unwrap_err(),
            DefinitionsError::UnsupportedKey { .. }
        ));
    }

    #[test]
    fn accepts_every_supported_data_type() {
        let yaml = "name: event\nattributes:\n- name: a\n  type: bool\n- name: b\n  type: int\n- name: c\n  type: str\n- name: d\n  type: timestamp\n- name: e\n  type: AttributeContainerIdentifier\n";
        assert!(read_str(yaml).is_ok());
    }
}
