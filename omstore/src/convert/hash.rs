use super::{decode_error, parse_point, type_mismatch};
use crate::entity::{format_number, millis_to_date, EntityData, EntityValue};
use crate::error::Result;
use crate::schema::{FieldDefinition, FieldType, Schema};
use std::collections::HashMap;

/// Flat record: storage name -> string value
pub type HashRecord = HashMap<String, String>;

/// Converts entity data to and from flat string maps.
#[derive(Debug, Clone, Copy)]
pub struct HashConverter<'a> {
    schema: &'a Schema,
}

impl<'a> HashConverter<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        HashConverter { schema }
    }

    pub fn encode(&self, data: &EntityData) -> Result<HashRecord> {
        let mut record = HashRecord::new();
        for (name, definition) in self.schema.fields() {
            if let Some(value) = data.get(name) {
                let encoded = encode_value(name, definition, value)?;
                record.insert(definition.storage_name(name).to_string(), encoded);
            }
        }
        Ok(record)
    }

    pub fn decode(&self, record: &HashRecord) -> Result<EntityData> {
        let mut data = EntityData::new();
        for (name, definition) in self.schema.fields() {
            if let Some(raw) = record.get(definition.storage_name(name)) {
                data.insert(name.to_string(), decode_value(name, definition, raw)?);
            }
        }

        if log::log_enabled!(log::Level::Trace) {
            for key in record.keys() {
                let declared = self
                    .schema
                    .fields()
                    .any(|(name, def)| def.storage_name(name) == key);
                if !declared {
                    log::trace!("Ignoring undeclared hash field '{key}'");
                }
            }
        }

        Ok(data)
    }
}

fn encode_value(name: &str, definition: &FieldDefinition, value: &EntityValue) -> Result<String> {
    let mismatch = || type_mismatch(name, definition, value);

    match definition.field_type() {
        FieldType::Number => {
            let EntityValue::Number(n) = value else {
                return Err(mismatch());
            };
            Ok(format_number(*n))
        }
        FieldType::Boolean => {
            let EntityValue::Boolean(b) = value else {
                return Err(mismatch());
            };
            Ok(if *b { "1" } else { "0" }.to_string())
        }
        FieldType::String | FieldType::Text => {
            let EntityValue::String(s) = value else {
                return Err(mismatch());
            };
            Ok(s.clone())
        }
        FieldType::Point => {
            let EntityValue::Point(point) = value else {
                return Err(mismatch());
            };
            Ok(point.to_string())
        }
        FieldType::Date => {
            let EntityValue::Date(date) = value else {
                return Err(mismatch());
            };
            Ok(date.timestamp_millis().to_string())
        }
        FieldType::StringArray => {
            let EntityValue::StringArray(items) = value else {
                return Err(mismatch());
            };
            // Must split back into the same items; `[""]` would read back as `[]`
            let separator = definition.separator();
            let lone_empty = matches!(items.as_slice(), [only] if only.is_empty());
            if lone_empty || items.iter().any(|item| item.contains(separator)) {
                return Err(mismatch());
            }
            Ok(items.join(separator))
        }
        FieldType::OpaqueObject => {
            let EntityValue::Object(json) = value else {
                return Err(mismatch());
            };
            Ok(serde_json::to_string(json)?)
        }
    }
}

fn decode_value(name: &str, definition: &FieldDefinition, raw: &str) -> Result<EntityValue> {
    match definition.field_type() {
        FieldType::Number => raw
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(EntityValue::Number)
            .ok_or_else(|| decode_error(name, raw, "expected a number")),
        FieldType::Boolean => match raw {
            "1" => Ok(EntityValue::Boolean(true)),
            "0" => Ok(EntityValue::Boolean(false)),
            _ => Err(decode_error(name, raw, "expected \"0\" or \"1\"")),
        },
        FieldType::String | FieldType::Text => Ok(EntityValue::String(raw.to_string())),
        FieldType::Point => parse_point(name, raw).map(EntityValue::Point),
        FieldType::Date => raw
            .parse::<i64>()
            .ok()
            .and_then(millis_to_date)
            .map(EntityValue::Date)
            .ok_or_else(|| decode_error(name, raw, "expected epoch milliseconds")),
        FieldType::StringArray => {
            let items = if raw.is_empty() {
                Vec::new()
            } else {
                raw.split(definition.separator()).map(String::from).collect()
            };
            Ok(EntityValue::StringArray(items))
        }
        FieldType::OpaqueObject => serde_json::from_str(raw)
            .map(EntityValue::Object)
            .map_err(|e| decode_error(name, raw, format!("invalid JSON: {e}"))),
    }
}
