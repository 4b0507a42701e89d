// Typed entity values and the schema-validated field bag

mod coerce;

pub use coerce::{coerce, format_number, millis_to_date, parse_date};

use crate::error::{OmError, Result};
use crate::schema::Schema;
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashMap;
use std::fmt;

/// Entity data keyed by field name (not alias). Absence of a key means unset.
pub type EntityData = HashMap<String, EntityValue>;

/// A geographic coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub longitude: f64,
    pub latitude: f64,
}

impl Point {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Point { longitude, latitude }
    }

    pub(crate) fn is_finite(&self) -> bool {
        self.longitude.is_finite() && self.latitude.is_finite()
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.longitude, self.latitude)
    }
}

/// A normalized field value
#[derive(Debug, Clone, PartialEq)]
pub enum EntityValue {
    Number(f64),
    Boolean(bool),
    /// Value of a `string` or `text` field
    String(String),
    Point(Point),
    Date(DateTime<Utc>),
    StringArray(Vec<String>),
    Object(serde_json::Value),
}

impl EntityValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            EntityValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            EntityValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            EntityValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_point(&self) -> Option<Point> {
        match self {
            EntityValue::Point(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            EntityValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            EntityValue::StringArray(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&serde_json::Value> {
        match self {
            EntityValue::Object(json) => Some(json),
            _ => None,
        }
    }

    /// Map a JSON value onto a candidate value. `null` maps to `None` (unset).
    pub fn from_json(json: serde_json::Value) -> Option<EntityValue> {
        match json {
            serde_json::Value::Null => None,
            serde_json::Value::Bool(b) => Some(EntityValue::Boolean(b)),
            serde_json::Value::Number(n) => n.as_f64().map(EntityValue::Number),
            serde_json::Value::String(s) => Some(EntityValue::String(s)),
            other => Some(EntityValue::Object(other)),
        }
    }

    /// Human-facing JSON view: dates as RFC 3339, points as objects.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            EntityValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            EntityValue::Boolean(b) => serde_json::Value::Bool(*b),
            EntityValue::String(s) => serde_json::Value::String(s.clone()),
            EntityValue::Point(p) => serde_json::json!({
                "longitude": p.longitude,
                "latitude": p.latitude,
            }),
            EntityValue::Date(d) => {
                serde_json::Value::String(d.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            EntityValue::StringArray(items) => serde_json::Value::Array(
                items.iter().cloned().map(serde_json::Value::String).collect(),
            ),
            EntityValue::Object(json) => json.clone(),
        }
    }

    /// Short description used in error messages, e.g. `string "abc"`.
    pub fn describe(&self) -> String {
        match self {
            EntityValue::Number(n) => format!("number {n}"),
            EntityValue::Boolean(b) => format!("boolean {b}"),
            EntityValue::String(s) => format!("string {s:?}"),
            EntityValue::Point(p) => format!("point {p}"),
            EntityValue::Date(d) => format!("date {}", d.to_rfc3339()),
            EntityValue::StringArray(items) => format!("string array {items:?}"),
            EntityValue::Object(json) => format!("object {json}"),
        }
    }
}

impl From<f64> for EntityValue {
    fn from(n: f64) -> Self {
        EntityValue::Number(n)
    }
}

impl From<f32> for EntityValue {
    fn from(n: f32) -> Self {
        EntityValue::Number(f64::from(n))
    }
}

impl From<i32> for EntityValue {
    fn from(n: i32) -> Self {
        EntityValue::Number(f64::from(n))
    }
}

impl From<u32> for EntityValue {
    fn from(n: u32) -> Self {
        EntityValue::Number(f64::from(n))
    }
}

impl From<i64> for EntityValue {
    fn from(n: i64) -> Self {
        EntityValue::Number(n as f64)
    }
}

impl From<bool> for EntityValue {
    fn from(b: bool) -> Self {
        EntityValue::Boolean(b)
    }
}

impl From<&str> for EntityValue {
    fn from(s: &str) -> Self {
        EntityValue::String(s.to_string())
    }
}

impl From<String> for EntityValue {
    fn from(s: String) -> Self {
        EntityValue::String(s)
    }
}

impl From<Point> for EntityValue {
    fn from(p: Point) -> Self {
        EntityValue::Point(p)
    }
}

impl From<DateTime<Utc>> for EntityValue {
    fn from(d: DateTime<Utc>) -> Self {
        EntityValue::Date(d)
    }
}

impl From<Vec<String>> for EntityValue {
    fn from(items: Vec<String>) -> Self {
        EntityValue::StringArray(items)
    }
}

impl From<Vec<&str>> for EntityValue {
    fn from(items: Vec<&str>) -> Self {
        EntityValue::StringArray(items.into_iter().map(String::from).collect())
    }
}

/// A record of one schema's entity type with typed, validated field access.
///
/// Values are checked and normalized against the field definition on every
/// `set`; reading or writing a field the schema does not declare fails with
/// `UnknownField`.
#[derive(Debug, Clone)]
pub struct Entity<'a> {
    schema: &'a Schema,
    key: Option<String>,
    data: EntityData,
}

impl<'a> Entity<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Entity {
            schema,
            key: None,
            data: EntityData::new(),
        }
    }

    /// Build an entity from unvalidated data, coercing every value.
    pub fn from_data(schema: &'a Schema, data: EntityData) -> Result<Self> {
        let mut entity = Entity::new(schema);
        for (name, value) in data {
            entity.set(&name, value)?;
        }
        Ok(entity)
    }

    /// Build an entity from a JSON object keyed by field name.
    pub fn from_json(schema: &'a Schema, json: serde_json::Value) -> Result<Self> {
        let map = match json {
            serde_json::Value::Object(map) => map,
            other => {
                return Err(OmError::TypeMismatch {
                    field: schema.entity_name().to_string(),
                    field_type: "object".into(),
                    value: other.to_string(),
                })
            }
        };

        let mut entity = Entity::new(schema);
        for (name, value) in map {
            entity.set_json(&name, value)?;
        }
        Ok(entity)
    }

    /// Wrap already-decoded storage data.
    pub(crate) fn from_storage(schema: &'a Schema, key: String, data: EntityData) -> Self {
        Entity {
            schema,
            key: Some(key),
            data,
        }
    }

    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    /// Storage key, once the entity has been saved or loaded.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Entity id, i.e. the storage key without the schema prefix.
    pub fn id(&self) -> Option<&str> {
        self.key
            .as_deref()
            .map(|key| self.schema.id_from_key(key).unwrap_or(key))
    }

    pub(crate) fn set_key(&mut self, key: String) {
        self.key = Some(key);
    }

    pub fn get(&self, name: &str) -> Result<Option<&EntityValue>> {
        self.schema.resolve(name)?;
        Ok(self.data.get(name))
    }

    pub fn set(&mut self, name: &str, value: impl Into<EntityValue>) -> Result<()> {
        let definition = self.schema.resolve(name)?;
        let value = coerce(name, definition, value.into())?;
        self.data.insert(name.to_string(), value);
        Ok(())
    }

    /// Set from a dynamic JSON value; `null` unsets the field.
    pub fn set_json(&mut self, name: &str, json: serde_json::Value) -> Result<()> {
        match EntityValue::from_json(json) {
            Some(value) => self.set(name, value),
            None => self.unset(name),
        }
    }

    pub fn unset(&mut self, name: &str) -> Result<()> {
        self.schema.resolve(name)?;
        self.data.remove(name);
        Ok(())
    }

    pub fn data(&self) -> &EntityData {
        &self.data
    }

    pub fn into_data(self) -> EntityData {
        self.data
    }

    /// JSON object of the set fields, keyed by field name.
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (name, _) in self.schema.fields() {
            if let Some(value) = self.data.get(name) {
                map.insert(name.to_string(), value.to_json());
            }
        }
        serde_json::Value::Object(map)
    }
}
