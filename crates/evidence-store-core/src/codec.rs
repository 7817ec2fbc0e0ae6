use crate::error::StoreError;
use crate::types::{AttributeValue, ContainerIdentifier};

/// The physical storage type a logical type maps to in a row-oriented
/// (typed-column) backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStorageType {
    Integer,
    Text,
}

/// A value as stored in a single typed column, independent of which SQL (or
/// SQL-like) engine is doing the storing.
#[derive(Debug, Clone, PartialEq)]
pub enum RowValue {
    Integer(i64),
    Text(String),
}

/// Encodes and decodes one logical type for both supported methods: `json`
/// and `row-column`. Implementations must satisfy "deserialize after
/// serialize is the identity" for every value they accept.
pub trait LogicalTypeCodec: Send + Sync {
    fn row_storage_type(&self) -> RowStorageType;

    fn json_encode(&self, value: &AttributeValue) -> Result<serde_json::Value, StoreError>;
    fn json_decode(&self, value: &serde_json::Value) -> Result<AttributeValue, StoreError>;

    fn row_encode(&self, value: &AttributeValue) -> Result<RowValue, StoreError>;
    fn row_decode(&self, value: &RowValue) -> Result<AttributeValue, StoreError>;
}

fn type_error(expected: &str, value: &AttributeValue) -> StoreError {
    StoreError::Backend {
        message: format!("expected a {expected} value to encode, got {value:?}"),
    }
}

pub struct BoolCodec;

impl LogicalTypeCodec for BoolCodec {
    fn row_storage_type(&self) -> RowStorageType {
        RowStorageType::Integer
    }

    fn json_encode(&self, value: &AttributeValue) -> Result<serde_json::Value, StoreError> {
        let b = value.as_bool().ok_or_else(|| type_error("bool", value))?;
        Ok(serde_json::Value::Bool(b))
    }

    fn json_decode(&self, value: &serde_json::Value) -> Result<AttributeValue, StoreError> {
        value
            .as_bool()
            .map(AttributeValue::Bool)
            .ok_or_else(|| StoreError::Backend {
                message: format!("expected a JSON boolean, got {value}"),
            })
    }

    fn row_encode(&self, value: &AttributeValue) -> Result<RowValue, StoreError> {
        let b = value.as_bool().ok_or_else(|| type_error("bool", value))?;
        Ok(RowValue::Integer(if b { 1 } else { 0 }))
    }

    fn row_decode(&self, value: &RowValue) -> Result<AttributeValue, StoreError> {
        match value {
            RowValue::Integer(i) => Ok(AttributeValue::Bool(*i != 0)),
            RowValue::Text(_) => Err(StoreError::Backend {
                message: "expected an integer column for bool".into(),
            }),
        }
    }
}

pub struct IntCodec;

impl LogicalTypeCodec for IntCodec {
    fn row_storage_type(&self) -> RowStorageType {
        RowStorageType::Integer
    }

    fn json_encode(&self, value: &AttributeValue) -> Result<serde_json::Value, StoreError> {
        let i = value.as_int().ok_or_else(|| type_error("int", value))?;
        Ok(serde_json::Value::from(i))
    }

    fn json_decode(&self, value: &serde_json::Value) -> Result<AttributeValue, StoreError> {
        value
            .as_i64()
            .map(AttributeValue::Int)
            .ok_or_else(|| StoreError::Backend {
                message: format!("expected a JSON integer, got {value}"),
            })
    }

    fn row_encode(&self, value: &AttributeValue) -> Result<RowValue, StoreError> {
        let i = value.as_int().ok_or_else(|| type_error("int", value))?;
        Ok(RowValue::Integer(i))
    }

    fn row_decode(&self, value: &RowValue) -> Result<AttributeValue, StoreError> {
        match value {
            RowValue::Integer(i) => Ok(AttributeValue::Int(*i)),
            RowValue::Text(_) => Err(StoreError::Backend {
                message: "expected an integer column for int".into(),
            }),
        }
    }
}

pub struct StrCodec;

impl LogicalTypeCodec for StrCodec {
    fn row_storage_type(&self) -> RowStorageType {
        RowStorageType::Text
    }

    fn json_encode(&self, value: &AttributeValue) -> Result<serde_json::Value, StoreError> {
        let s = value.as_str().ok_or_else(|| type_error("str", value))?;
        Ok(serde_json::Value::String(s.to_string()))
    }

    fn json_decode(&self, value: &serde_json::Value) -> Result<AttributeValue, StoreError> {
        value
            .as_str()
            .map(|s| AttributeValue::Str(s.to_string()))
            .ok_or_else(|| StoreError::Backend {
                message: format!("expected a JSON string, got {value}"),
            })
    }

    fn row_encode(&self, value: &AttributeValue) -> Result<RowValue, StoreError> {
        let s = value.as_str().ok_or_else(|| type_error("str", value))?;
        Ok(RowValue::Text(s.to_string()))
    }

    fn row_decode(&self, value: &RowValue) -> Result<AttributeValue, StoreError> {
        match value {
            RowValue::Text(s) => Ok(AttributeValue::Str(s.clone())),
            RowValue::Integer(_) => Err(StoreError::Backend {
                message: "expected a text column for str".into(),
            }),
        }
    }
}

pub struct TimestampCodec;

impl LogicalTypeCodec for TimestampCodec {
    fn row_storage_type(&self) -> RowStorageType {
        RowStorageType::Integer
    }

    fn json_encode(&self, value: &AttributeValue) -> Result<serde_json::Value, StoreError> {
        let t = value
            .as_timestamp()
            .ok_or_else(|| type_error("timestamp", value))?;
        Ok(serde_json::Value::from(t))
    }

    fn json_decode(&self, value: &serde_json::Value) -> Result<AttributeValue, StoreError> {
        value
            .as_i64()
            .map(AttributeValue::Timestamp)
            .ok_or_else(|| StoreError::Backend {
                message: format!("expected a JSON integer timestamp, got {value}"),
            })
    }

    fn row_encode(&self, value: &AttributeValue) -> Result<RowValue, StoreError> {
        let t = value
            .as_timestamp()
            .ok_or_else(|| type_error("timestamp", value))?;
        Ok(RowValue::Integer(t))
    }

    fn row_decode(&self, value: &RowValue) -> Result<AttributeValue, StoreError> {
        match value {
            RowValue::Integer(i) => Ok(AttributeValue::Timestamp(*i)),
            RowValue::Text(_) => Err(StoreError::Backend {
                message: "expected an integer column for timestamp".into(),
            }),
        }
    }
}

pub struct IdentifierCodec;

impl LogicalTypeCodec for IdentifierCodec {
    fn row_storage_type(&self) -> RowStorageType {
        RowStorageType::Text
    }

    fn json_encode(&self, value: &AttributeValue) -> Result<serde_json::Value, StoreError> {
        let id = value
            .as_identifier()
            .ok_or_else(|| type_error("AttributeContainerIdentifier", value))?;
        Ok(serde_json::Value::String(id.to_canonical_string()))
    }

    fn json_decode(&self, value: &serde_json::Value) -> Result<AttributeValue, StoreError> {
        let s = value.as_str().ok_or_else(|| StoreError::Backend {
            message: format!("expected a JSON string identifier, got {value}"),
        })?;
        Ok(AttributeValue::Identifier(ContainerIdentifier::parse(s)?))
    }

    fn row_encode(&self, value: &AttributeValue) -> Result<RowValue, StoreError> {
        let id = value
            .as_identifier()
            .ok_or_else(|| type_error("AttributeContainerIdentifier", value))?;
        Ok(RowValue::Text(id.to_canonical_string()))
    }

    fn row_decode(&self, value: &RowValue) -> Result<AttributeValue, StoreError> {
        match value {
            RowValue::Text(s) => Ok(AttributeValue::Identifier(ContainerIdentifier::parse(s)?)),
            RowValue::Integer(_) => Err(StoreError::Backend {
                message: "expected a text column for AttributeContainerIdentifier".into(),
            }),
        }
    }
}

/// `sequence<str>`, stored as a JSON array in both encodings (the
/// row-column form stores the array as serialized JSON text, per the "text
/// (JSON array)" row in the serializer table).
pub struct StrSequenceCodec;

impl LogicalTypeCodec for StrSequenceCodec {
    fn row_storage_type(&self) -> RowStorageType {
        RowStorageType::Text
    }

    fn json_encode(&self, value: &AttributeValue) -> Result<serde_json::Value, StoreError> {
        let items = value
            .as_str_sequence()
            .ok_or_else(|| type_error("sequence<str>", value))?;
        Ok(serde_json::Value::Array(
            items.iter().cloned().map(serde_json::Value::String).collect(),
        ))
    }

    fn json_decode(&self, value: &serde_json::Value) -> Result<AttributeValue, StoreError> {
        let array = value.as_array().ok_or_else(|| StoreError::Backend {
            message: format!("expected a JSON array, got {value}"),
        })?;
        let items = array
            .iter()
            .map(|v| {
                v.as_str().map(str::to_string).ok_or_else(|| StoreError::Backend {
                    message: format!("expected a JSON string element, got {v}"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(AttributeValue::StrSequence(items))
    }

    fn row_encode(&self, value: &AttributeValue) -> Result<RowValue, StoreError> {
        let json = self.json_encode(value)?;
        Ok(RowValue::Text(json.to_string()))
    }

    fn row_decode(&self, value: &RowValue) -> Result<AttributeValue, StoreError> {
        match value {
            RowValue::Text(s) => {
                let json: serde_json::Value =
                    serde_json::from_str(s).map_err(|e| StoreError::Backend {
                        message: format!("invalid sequence<str> column: {e}"),
                    })?;
                self.json_decode(&json)
            }
            RowValue::Integer(_) => Err(StoreError::Backend {
                message: "expected a text column for sequence<str>".into(),
            }),
        }
    }
}
