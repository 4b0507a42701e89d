// Entity <-> storage record conversion, one converter per data structure

mod hash;
mod json;

pub use hash::{HashConverter, HashRecord};
pub use json::JsonConverter;

use crate::entity::{EntityData, EntityValue, Point};
use crate::error::{OmError, Result};
use crate::schema::{DataStructure, FieldDefinition, Schema};

/// A record as exchanged with the store
#[derive(Debug, Clone, PartialEq)]
pub enum StorageRecord {
    Hash(HashRecord),
    Json(serde_json::Value),
}

impl StorageRecord {
    pub fn data_structure(&self) -> DataStructure {
        match self {
            StorageRecord::Hash(_) => DataStructure::Hash,
            StorageRecord::Json(_) => DataStructure::Json,
        }
    }

    /// True when the record holds no fields at all.
    pub fn is_empty(&self) -> bool {
        match self {
            StorageRecord::Hash(fields) => fields.is_empty(),
            StorageRecord::Json(serde_json::Value::Object(map)) => map.is_empty(),
            StorageRecord::Json(serde_json::Value::Null) => true,
            StorageRecord::Json(_) => false,
        }
    }
}

/// Encode entity data with the converter for the schema's data structure.
pub fn encode(schema: &Schema, data: &EntityData) -> Result<StorageRecord> {
    match schema.data_structure() {
        DataStructure::Hash => HashConverter::new(schema).encode(data).map(StorageRecord::Hash),
        DataStructure::Json => JsonConverter::new(schema).encode(data).map(StorageRecord::Json),
    }
}

/// Decode a record with the converter matching its own kind.
pub fn decode(schema: &Schema, record: &StorageRecord) -> Result<EntityData> {
    match record {
        StorageRecord::Hash(fields) => HashConverter::new(schema).decode(fields),
        StorageRecord::Json(document) => JsonConverter::new(schema).decode(document),
    }
}

pub(crate) fn decode_error(field: &str, value: impl Into<String>, reason: impl Into<String>) -> OmError {
    OmError::Decode {
        field: field.to_string(),
        value: value.into(),
        reason: reason.into(),
    }
}

pub(crate) fn type_mismatch(field: &str, definition: &FieldDefinition, value: &EntityValue) -> OmError {
    OmError::TypeMismatch {
        field: field.to_string(),
        field_type: definition.field_type().to_string(),
        value: value.describe(),
    }
}

/// Parse the `"{longitude},{latitude}"` form shared by both encodings.
pub(crate) fn parse_point(field: &str, raw: &str) -> Result<Point> {
    let (longitude, latitude) = raw
        .split_once(',')
        .ok_or_else(|| decode_error(field, raw, "expected \"longitude,latitude\""))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(|| decode_error(field, raw, "coordinates must be finite numbers"))
    };
    Ok(Point::new(parse(longitude)?, parse(latitude)?))
}
