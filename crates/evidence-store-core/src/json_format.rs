use serde_json::{Map, Value};

use crate::container::Container;
use crate::error::StoreError;
use crate::registry::{ContainerRegistry, DataTypeRegistry, Encoding};

const TYPE_KEY: &str = "__type__";
const CONTAINER_TYPE_KEY: &str = "__container_type__";
const TYPE_VALUE: &str = "AttributeContainer";

/// Serializes `container` to the JSON document format (§4.10): an object
/// with `__type__: "AttributeContainer"`, `__container_type__: <type
/// name>`, and one entry per non-absent declared field, encoded through
/// `types`.
pub fn container_to_json(
    container: &Container,
    types: &DataTypeRegistry,
) -> Result<Value, StoreError> {
    let mut object = Map::new();
    object.insert(TYPE_KEY.to_string(), Value::String(TYPE_VALUE.to_string()));
    object.insert(
        CONTAINER_TYPE_KEY.to_string(),
        Value::String(container.type_name().to_string()),
    );

    for field in &container.schema().fields {
        let value = container
            .get(field.name.as_str())
            .expect("field declared on schema must be addressable");
        if value.is_absent() {
            continue;
        }
        let codec = types
            .serializer(field.logical_type.as_str(), Encoding::Json)
            .ok_or_else(|| StoreError::UnknownLogicalType {
                logical_type: field.logical_type.to_string(),
            })?;
        object.insert(field.name.to_string(), codec.json_encode(value)?);
    }

    Ok(Value::Object(object))
}

/// Deserializes a JSON document back into a `Container`. Unknown top-level
/// keys are ignored; unknown field names (not in the class's declared set)
/// are discarded; `__container_type__` must name a registered type or this
/// fails (decoding never reflectively creates unknown container types).
pub fn json_to_container(
    json: &Value,
    containers: &ContainerRegistry,
    types: &DataTypeRegistry,
) -> Result<Container, StoreError> {
    let object = json.as_object().ok_or_else(|| StoreError::Parse {
        message: "JSON document must be an object".into(),
    })?;

    let container_type = object
        .get(CONTAINER_TYPE_KEY)
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::Parse {
            message: format!("JSON document missing '{CONTAINER_TYPE_KEY}'"),
        })?;

    let mut container = containers.create(container_type)?;
    let schema = container.schema().clone();

    for field in &schema.fields {
        let Some(raw) = object.get(field.name.as_str()) else {
            continue;
        };
        let codec = types
            .serializer(field.logical_type.as_str(), Encoding::Json)
            .ok_or_else(|| StoreError::UnknownLogicalType {
                logical_type: field.logical_type.to_string(),
            })?;
        container.set(field.name.as_str(), codec.json_decode(raw)?)?;
    }

    Ok(container)
}
