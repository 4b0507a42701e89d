// Write-time coercion of candidate values to a field's declared type

use super::{EntityValue, Point};
use crate::error::{OmError, Result};
use crate::schema::{FieldDefinition, FieldType};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Accept or reject `value` for the field `field_name`, returning the
/// normalized value to store.
pub fn coerce(field_name: &str, definition: &FieldDefinition, value: EntityValue) -> Result<EntityValue> {
    let field_type = definition.field_type();
    let mismatch = |value: &EntityValue| OmError::TypeMismatch {
        field: field_name.to_string(),
        field_type: field_type.to_string(),
        value: value.describe(),
    };

    match field_type {
        FieldType::Number => match value {
            EntityValue::Number(n) if n.is_finite() => Ok(EntityValue::Number(n)),
            other => Err(mismatch(&other)),
        },
        FieldType::Boolean => match value {
            EntityValue::Boolean(b) => Ok(EntityValue::Boolean(b)),
            other => Err(mismatch(&other)),
        },
        FieldType::String | FieldType::Text => match value {
            EntityValue::String(s) => Ok(EntityValue::String(s)),
            EntityValue::Number(n) if n.is_finite() => Ok(EntityValue::String(format_number(n))),
            EntityValue::Boolean(b) => Ok(EntityValue::String(b.to_string())),
            other => Err(mismatch(&other)),
        },
        FieldType::Point => match value {
            EntityValue::Point(point) if point.is_finite() => Ok(EntityValue::Point(point)),
            EntityValue::Object(ref json) => point_from_json(json)
                .map(EntityValue::Point)
                .ok_or_else(|| mismatch(&value)),
            other => Err(mismatch(&other)),
        },
        FieldType::Date => {
            let date = match &value {
                EntityValue::Date(date) => truncate_to_millis(date),
                EntityValue::String(s) => parse_date(s),
                EntityValue::Number(n) if n.is_finite() => millis_to_date(n.trunc() as i64),
                _ => None,
            };
            date.map(EntityValue::Date).ok_or_else(|| mismatch(&value))
        }
        FieldType::StringArray => match value {
            EntityValue::StringArray(items) => Ok(EntityValue::StringArray(items)),
            EntityValue::Object(serde_json::Value::Array(ref items)) => items
                .iter()
                .map(json_scalar_to_string)
                .collect::<Option<Vec<_>>>()
                .map(EntityValue::StringArray)
                .ok_or_else(|| mismatch(&value)),
            other => Err(mismatch(&other)),
        },
        FieldType::OpaqueObject => match value {
            EntityValue::Object(json) if json.is_object() || json.is_array() => {
                Ok(EntityValue::Object(json))
            }
            other => Err(mismatch(&other)),
        },
    }
}

/// Render a number the way it is written to storage (`1.0` -> `"1"`).
pub fn format_number(n: f64) -> String {
    n.to_string()
}

/// Build a UTC instant from epoch milliseconds.
pub fn millis_to_date(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}

fn truncate_to_millis(date: &DateTime<Utc>) -> Option<DateTime<Utc>> {
    millis_to_date(date.timestamp_millis())
}

/// Parse RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS[.fff]` (taken as UTC) or a bare `YYYY-MM-DD`.
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    let parsed = DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|d| d.and_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|d| d.and_utc())
        })?;
    truncate_to_millis(&parsed)
}

fn point_from_json(json: &serde_json::Value) -> Option<Point> {
    let longitude = json.get("longitude")?.as_f64()?;
    let latitude = json.get("latitude")?.as_f64()?;
    let point = Point::new(longitude, latitude);
    point.is_finite().then_some(point)
}

fn json_scalar_to_string(json: &serde_json::Value) -> Option<String> {
    match json {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => n.as_f64().map(format_number),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn def(field_type: FieldType) -> FieldDefinition {
        FieldDefinition::new(field_type)
    }

    fn assert_mismatch(result: Result<EntityValue>, field: &str, field_type: &str) {
        match result {
            Err(OmError::TypeMismatch { field: f, field_type: t, .. }) => {
                assert_eq!(f, field);
                assert_eq!(t, field_type);
            }
            other => panic!("expected TypeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_number_accepts_finite_only() {
        let number = def(FieldType::Number);
        assert_eq!(
            coerce("n", &number, EntityValue::Number(42.5)).unwrap(),
            EntityValue::Number(42.5)
        );
        assert_mismatch(coerce("n", &number, EntityValue::Number(f64::NAN)), "n", "number");
        assert_mismatch(coerce("n", &number, "42".into()), "n", "number");
    }

    #[test]
    fn test_falsy_values_are_kept() {
        assert_eq!(
            coerce("n", &def(FieldType::Number), EntityValue::Number(0.0)).unwrap(),
            EntityValue::Number(0.0)
        );
        assert_eq!(
            coerce("s", &def(FieldType::String), "".into()).unwrap(),
            EntityValue::String(String::new())
        );
        assert_eq!(
            coerce("b", &def(FieldType::Boolean), false.into()).unwrap(),
            EntityValue::Boolean(false)
        );
    }

    #[test]
    fn test_string_coerces_primitives() {
        let string = def(FieldType::String);
        assert_eq!(coerce("s", &string, 42.into()).unwrap(), EntityValue::String("42".into()));
        assert_eq!(coerce("s", &string, 2.5.into()).unwrap(), EntityValue::String("2.5".into()));
        assert_eq!(coerce("s", &string, true.into()).unwrap(), EntityValue::String("true".into()));
        assert_mismatch(
            coerce("s", &string, EntityValue::StringArray(vec!["a".into()])),
            "s",
            "string",
        );

        let text = def(FieldType::Text);
        assert_eq!(coerce("t", &text, "hello".into()).unwrap(), EntityValue::String("hello".into()));
    }

    #[test]
    fn test_point_from_struct_and_json() {
        let point = def(FieldType::Point);
        let expected = EntityValue::Point(Point::new(-122.27, 37.8));
        assert_eq!(coerce("p", &point, Point::new(-122.27, 37.8).into()).unwrap(), expected);
        assert_eq!(
            coerce(
                "p",
                &point,
                EntityValue::Object(json!({ "longitude": -122.27, "latitude": 37.8 }))
            )
            .unwrap(),
            expected
        );
        assert_mismatch(
            coerce("p", &point, EntityValue::Object(json!({ "longitude": "west" }))),
            "p",
            "point",
        );
    }

    #[test]
    fn test_date_inputs_normalize_to_same_instant() {
        let date = def(FieldType::Date);
        let expected = EntityValue::Date(millis_to_date(1_622_505_600_000).unwrap());

        assert_eq!(coerce("d", &date, "2021-06-01T00:00:00.000Z".into()).unwrap(), expected);
        assert_eq!(coerce("d", &date, "2021-06-01".into()).unwrap(), expected);
        assert_eq!(coerce("d", &date, 1_622_505_600_000_i64.into()).unwrap(), expected);
        let instant = DateTime::parse_from_rfc3339("2021-06-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(coerce("d", &date, instant.into()).unwrap(), expected);
    }

    #[test]
    fn test_date_truncates_to_millis() {
        let date = def(FieldType::Date);
        let precise = DateTime::parse_from_rfc3339("2021-06-01T00:00:00.123456Z")
            .unwrap()
            .with_timezone(&Utc);
        let coerced = coerce("d", &date, precise.into()).unwrap();
        assert_eq!(coerced.as_date().unwrap().timestamp_millis(), 1_622_505_600_123);
        assert_eq!(coerced.as_date().unwrap().timestamp_subsec_nanos(), 123_000_000);
    }

    #[test]
    fn test_date_rejects_garbage() {
        assert_mismatch(coerce("d", &def(FieldType::Date), "next tuesday".into()), "d", "date");
        assert_mismatch(coerce("d", &def(FieldType::Date), true.into()), "d", "date");
    }

    #[test]
    fn test_string_array_coerces_elements() {
        let array = def(FieldType::StringArray);
        assert_eq!(
            coerce("tags", &array, EntityValue::Object(json!(["a", 1, true]))).unwrap(),
            EntityValue::StringArray(vec!["a".into(), "1".into(), "true".into()])
        );
        assert_eq!(
            coerce("tags", &array, vec!["x", "y"].into()).unwrap(),
            EntityValue::StringArray(vec!["x".into(), "y".into()])
        );
        assert_mismatch(
            coerce("tags", &array, EntityValue::Object(json!([{ "nested": 1 }]))),
            "tags",
            "string-array",
        );
        assert_mismatch(coerce("tags", &array, "a|b".into()), "tags", "string-array");
    }

    #[test]
    fn test_opaque_object_passes_through() {
        let object = def(FieldType::OpaqueObject);
        let value = json!({ "producer": { "name": "Rick" }, "tracks": [1, 2] });
        assert_eq!(
            coerce("credits", &object, EntityValue::Object(value.clone())).unwrap(),
            EntityValue::Object(value)
        );
        assert_mismatch(coerce("credits", &object, 3.into()), "credits", "opaque-object");
    }

    #[test]
    fn test_mismatch_message_names_value() {
        let err = coerce("year", &def(FieldType::Number), "nineteen".into()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("year"));
        assert!(message.contains("number"));
        assert!(message.contains("nineteen"));
    }
}
