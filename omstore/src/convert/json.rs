use super::{decode_error, parse_point, type_mismatch};
use crate::entity::{millis_to_date, EntityData, EntityValue};
use crate::error::Result;
use crate::schema::{FieldDefinition, FieldType, Schema};
use serde_json::{Map, Value};

/// Converts entity data to and from structured JSON documents.
///
/// Numbers, booleans, string arrays and objects keep their native JSON
/// types; dates are stored as epoch milliseconds and points as
/// `"longitude,latitude"` strings so the index can read them.
#[derive(Debug, Clone, Copy)]
pub struct JsonConverter<'a> {
    schema: &'a Schema,
}

impl<'a> JsonConverter<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        JsonConverter { schema }
    }

    pub fn encode(&self, data: &EntityData) -> Result<Value> {
        let mut document = Map::new();
        for (name, definition) in self.schema.fields() {
            if let Some(value) = data.get(name) {
                let encoded = encode_value(name, definition, value)?;
                document.insert(definition.storage_name(name).to_string(), encoded);
            }
        }
        Ok(Value::Object(document))
    }

    /// Decode a stored document. A `null` document decodes to empty data and
    /// a `null` field is treated as unset.
    pub fn decode(&self, document: &Value) -> Result<EntityData> {
        let map = match document {
            Value::Null => return Ok(EntityData::new()),
            Value::Object(map) => map,
            other => return Err(decode_error("$", other.to_string(), "expected a JSON object")),
        };

        let mut data = EntityData::new();
        for (name, definition) in self.schema.fields() {
            match map.get(definition.storage_name(name)) {
                None | Some(Value::Null) => {}
                Some(raw) => {
                    data.insert(name.to_string(), decode_value(name, definition, raw)?);
                }
            }
        }
        Ok(data)
    }
}

fn encode_value(name: &str, definition: &FieldDefinition, value: &EntityValue) -> Result<Value> {
    let mismatch = || type_mismatch(name, definition, value);

    match definition.field_type() {
        FieldType::Number => {
            let EntityValue::Number(n) = value else {
                return Err(mismatch());
            };
            serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .ok_or_else(mismatch)
        }
        FieldType::Boolean => {
            let EntityValue::Boolean(b) = value else {
                return Err(mismatch());
            };
            Ok(Value::Bool(*b))
        }
        FieldType::String | FieldType::Text => {
            let EntityValue::String(s) = value else {
                return Err(mismatch());
            };
            Ok(Value::String(s.clone()))
        }
        FieldType::Point => {
            let EntityValue::Point(point) = value else {
                return Err(mismatch());
            };
            Ok(Value::String(point.to_string()))
        }
        FieldType::Date => {
            let EntityValue::Date(date) = value else {
                return Err(mismatch());
            };
            Ok(Value::from(date.timestamp_millis()))
        }
        FieldType::StringArray => {
            let EntityValue::StringArray(items) = value else {
                return Err(mismatch());
            };
            Ok(Value::Array(items.iter().cloned().map(Value::String).collect()))
        }
        FieldType::OpaqueObject => {
            let EntityValue::Object(json) = value else {
                return Err(mismatch());
            };
            Ok(json.clone())
        }
    }
}

fn decode_value(name: &str, definition: &FieldDefinition, raw: &Value) -> Result<EntityValue> {
    let invalid = |reason: &str| decode_error(name, raw.to_string(), reason);

    match definition.field_type() {
        FieldType::Number => raw
            .as_f64()
            .map(EntityValue::Number)
            .ok_or_else(|| invalid("expected a number")),
        FieldType::Boolean => raw
            .as_bool()
            .map(EntityValue::Boolean)
            .ok_or_else(|| invalid("expected a boolean")),
        FieldType::String | FieldType::Text => raw
            .as_str()
            .map(|s| EntityValue::String(s.to_string()))
            .ok_or_else(|| invalid("expected a string")),
        FieldType::Point => {
            let text = raw.as_str().ok_or_else(|| invalid("expected a \"longitude,latitude\" string"))?;
            parse_point(name, text).map(EntityValue::Point)
        }
        FieldType::Date => raw
            .as_i64()
            .or_else(|| raw.as_f64().filter(|n| n.is_finite()).map(|n| n.trunc() as i64))
            .and_then(millis_to_date)
            .map(EntityValue::Date)
            .ok_or_else(|| invalid("expected epoch milliseconds")),
        FieldType::StringArray => {
            let items = raw.as_array().ok_or_else(|| invalid("expected an array of strings"))?;
            items
                .iter()
                .map(|item| item.as_str().map(String::from))
                .collect::<Option<Vec<_>>>()
                .map(EntityValue::StringArray)
                .ok_or_else(|| invalid("expected an array of strings"))
        }
        FieldType::OpaqueObject => Ok(EntityValue::Object(raw.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, Point};
    use crate::error::OmError;
    use crate::schema::parse_schema_str;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn test_schema() -> Schema {
        parse_schema_str(
            r#"
entity: sample
data_structure: JSON
fields:
  aNumber: { type: number }
  aBoolean: { type: boolean }
  aString: { type: string }
  someText: { type: text, alias: body }
  aPoint: { type: point }
  aDate: { type: date }
  someStrings: { type: string-array }
  anObject: { type: object }
"#,
        )
        .unwrap()
    }

    fn full_entity(schema: &Schema) -> Entity<'_> {
        let mut entity = Entity::new(schema);
        entity.set("aNumber", 42).unwrap();
        entity.set("aBoolean", false).unwrap();
        entity.set("aString", "foo").unwrap();
        entity.set("someText", "full text").unwrap();
        entity.set("aPoint", Point::new(-122.27, 37.8)).unwrap();
        entity.set("aDate", "2021-06-01T00:00:00.000Z").unwrap();
        entity.set("someStrings", vec!["alfa", "bravo"]).unwrap();
        entity
            .set_json("anObject", json!({ "deep": { "deeper": [true, null] } }))
            .unwrap();
        entity
    }

    #[test]
    fn test_encode_all_types() {
        let schema = test_schema();
        let encoded = JsonConverter::new(&schema)
            .encode(full_entity(&schema).data())
            .unwrap();

        assert_eq!(
            encoded,
            json!({
                "aNumber": 42.0,
                "aBoolean": false,
                "aString": "foo",
                "body": "full text",
                "aPoint": "-122.27,37.8",
                "aDate": 1_622_505_600_000_i64,
                "someStrings": ["alfa", "bravo"],
                "anObject": { "deep": { "deeper": [true, null] } },
            })
        );
    }

    #[test]
    fn test_round_trip_all_types() {
        let schema = test_schema();
        let converter = JsonConverter::new(&schema);
        let entity = full_entity(&schema);

        let decoded = converter.decode(&converter.encode(entity.data()).unwrap()).unwrap();
        assert_eq!(&decoded, entity.data());
    }

    #[test]
    fn test_decode_integer_numbers() {
        let schema = test_schema();
        let decoded = JsonConverter::new(&schema)
            .decode(&json!({ "aNumber": 7, "aDate": 1622505600000.0 }))
            .unwrap();
        assert_eq!(decoded["aNumber"], EntityValue::Number(7.0));
        assert_eq!(
            decoded["aDate"].as_date().map(|d| d.timestamp_millis()),
            Some(1_622_505_600_000)
        );
    }

    #[test]
    fn test_null_field_is_unset() {
        let schema = test_schema();
        let decoded = JsonConverter::new(&schema)
            .decode(&json!({ "aNumber": null, "aString": "bar" }))
            .unwrap();
        assert_eq!(decoded.len(), 1);
        assert!(!decoded.contains_key("aNumber"));
    }

    #[test]
    fn test_null_document_is_empty() {
        let schema = test_schema();
        let decoded = JsonConverter::new(&schema).decode(&Value::Null).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_non_object_document_fails() {
        let schema = test_schema();
        let err = JsonConverter::new(&schema).decode(&json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, OmError::Decode { .. }));
    }

    #[test]
    fn test_wrong_json_types_fail() {
        let schema = test_schema();
        let converter = JsonConverter::new(&schema);

        for (field, raw) in [
            ("aNumber", json!("42")),
            ("aBoolean", json!("true")),
            ("aString", json!(12)),
            ("aPoint", json!({ "longitude": 1, "latitude": 2 })),
            ("aDate", json!("2021-06-01")),
            ("someStrings", json!(["ok", 3])),
        ] {
            let document = json!({ field: raw.clone() });
            let err = converter.decode(&document).unwrap_err();
            assert!(
                matches!(&err, OmError::Decode { field: f, value: v, .. } if f == field && *v == raw.to_string()),
                "{field} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_unset_symmetry() {
        let schema = test_schema();
        let converter = JsonConverter::new(&schema);
        let mut entity = Entity::new(&schema);
        entity.set("aBoolean", true).unwrap();

        assert_eq!(converter.encode(entity.data()).unwrap(), json!({ "aBoolean": true }));
        let decoded = converter.decode(&json!({ "aBoolean": true })).unwrap();
        assert_eq!(decoded.len(), 1);
    }
}
