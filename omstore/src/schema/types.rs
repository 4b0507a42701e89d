use crate::error::{OmError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Separator used to join `string` and `string-array` values when none is configured.
pub const DEFAULT_SEPARATOR: &str = "|";

/// Field type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldType {
    String,
    Text,
    Number,
    Boolean,
    Point,
    Date,
    #[serde(alias = "string[]")]
    StringArray,
    #[serde(alias = "object")]
    OpaqueObject,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Point => "point",
            FieldType::Date => "date",
            FieldType::StringArray => "string-array",
            FieldType::OpaqueObject => "opaque-object",
        }
    }

    /// Whether the search index can keep a sort key for this type.
    pub fn supports_sorting(&self) -> bool {
        match self {
            FieldType::String
            | FieldType::Text
            | FieldType::Number
            | FieldType::Boolean
            | FieldType::Date => true,
            FieldType::Point | FieldType::StringArray | FieldType::OpaqueObject => false,
        }
    }

    fn supports_separator(&self) -> bool {
        matches!(self, FieldType::String | FieldType::StringArray)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_indexed() -> bool {
    true
}

/// Definition of a single entity field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDefinition {
    #[serde(rename = "type")]
    field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    separator: Option<String>,
    #[serde(default)]
    sortable: bool,
    #[serde(default = "default_indexed")]
    indexed: bool,
}

impl FieldDefinition {
    pub fn new(field_type: FieldType) -> Self {
        FieldDefinition {
            field_type,
            alias: None,
            separator: None,
            sortable: false,
            indexed: true,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }

    pub fn with_sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    pub fn with_indexed(mut self, indexed: bool) -> Self {
        self.indexed = indexed;
        self
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// The name this field is stored and indexed under.
    pub fn storage_name<'a>(&'a self, field_name: &'a str) -> &'a str {
        self.alias.as_deref().unwrap_or(field_name)
    }

    pub fn separator(&self) -> &str {
        self.separator.as_deref().unwrap_or(DEFAULT_SEPARATOR)
    }

    pub fn is_sortable(&self) -> bool {
        self.sortable
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    fn validate(&self, field_name: &str) -> Result<()> {
        if let Some(alias) = &self.alias {
            if alias.is_empty() {
                return Err(OmError::Schema(format!(
                    "Field '{field_name}' has an empty alias"
                )));
            }
        }
        if let Some(separator) = &self.separator {
            if !self.field_type.supports_separator() {
                return Err(OmError::Schema(format!(
                    "Field '{field_name}' of type {} cannot have a separator",
                    self.field_type
                )));
            }
            if separator.is_empty() {
                return Err(OmError::Schema(format!(
                    "Field '{field_name}' has an empty separator"
                )));
            }
        }
        if self.sortable && !self.field_type.supports_sorting() {
            return Err(OmError::Schema(format!(
                "Field '{field_name}' of type {} cannot be sortable",
                self.field_type
            )));
        }
        Ok(())
    }
}

/// Storage encoding of the records behind a schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataStructure {
    /// Flat field/value string map
    #[default]
    Hash,
    /// Structured JSON document
    Json,
}

impl DataStructure {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataStructure::Hash => "HASH",
            DataStructure::Json => "JSON",
        }
    }
}

impl fmt::Display for DataStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataStructure {
    type Err = OmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "HASH" => Ok(DataStructure::Hash),
            "JSON" => Ok(DataStructure::Json),
            _ => Err(OmError::InvalidSchemaOption {
                option: "data_structure".into(),
                value: s.to_string(),
            }),
        }
    }
}

/// Stop-word handling requested for the search index
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StopWords {
    /// Index every word
    Off,
    /// Use the backend's built-in list
    #[default]
    Default,
    /// Use the given list instead of the built-in one
    Custom(Vec<String>),
}

impl StopWords {
    /// Build from a mode name (`OFF`, `DEFAULT`, `CUSTOM`) and the custom word list.
    pub fn from_mode(mode: &str, words: Vec<String>) -> Result<Self> {
        match mode.to_ascii_uppercase().as_str() {
            "OFF" => Ok(StopWords::Off),
            "DEFAULT" => Ok(StopWords::Default),
            "CUSTOM" => Ok(StopWords::Custom(words)),
            _ => Err(OmError::InvalidSchemaOption {
                option: "use_stop_words".into(),
                value: mode.to_string(),
            }),
        }
    }
}

/// Field layout and index options for one kind of entity.
///
/// Fields keep their declaration order; index declarations are emitted in
/// that order. A `Schema` is immutable once built and can be shared freely.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    entity: String,
    fields: Vec<(String, FieldDefinition)>,
    data_structure: DataStructure,
    index_name: String,
    prefix: String,
    stop_words: StopWords,
}

impl Schema {
    pub fn builder(entity: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(entity)
    }

    pub fn entity_name(&self) -> &str {
        &self.entity
    }

    pub fn data_structure(&self) -> DataStructure {
        self.data_structure
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn stop_words(&self) -> &StopWords {
        &self.stop_words
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields
            .iter()
            .find(|(field_name, _)| field_name == name)
            .map(|(_, def)| def)
    }

    /// Look up a declared field, failing with `UnknownField` otherwise.
    pub fn resolve(&self, name: &str) -> Result<&FieldDefinition> {
        self.field(name).ok_or_else(|| OmError::UnknownField {
            field: name.to_string(),
        })
    }

    /// Declared fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldDefinition)> {
        self.fields.iter().map(|(name, def)| (name.as_str(), def))
    }

    /// Storage key for an entity id, e.g. `album:01H...`
    pub fn key_for(&self, id: &str) -> String {
        format!("{}:{}", self.prefix, id)
    }

    /// Strip this schema's key prefix, if present.
    pub fn id_from_key<'k>(&self, key: &'k str) -> Option<&'k str> {
        key.strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix(':'))
    }
}

/// Collects schema declarations and validates them once in [`SchemaBuilder::build`].
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    entity: String,
    fields: Vec<(String, FieldDefinition)>,
    data_structure: Option<String>,
    index_name: Option<String>,
    prefix: Option<String>,
    stop_words_mode: Option<String>,
    stop_words: Vec<String>,
}

impl SchemaBuilder {
    pub fn new(entity: impl Into<String>) -> Self {
        SchemaBuilder {
            entity: entity.into(),
            fields: Vec::new(),
            data_structure: None,
            index_name: None,
            prefix: None,
            stop_words_mode: None,
            stop_words: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, definition: FieldDefinition) -> Self {
        self.fields.push((name.into(), definition));
        self
    }

    pub fn data_structure(mut self, data_structure: impl Into<String>) -> Self {
        self.data_structure = Some(data_structure.into());
        self
    }

    pub fn index_name(mut self, index_name: impl Into<String>) -> Self {
        self.index_name = Some(index_name.into());
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn use_stop_words(mut self, mode: impl Into<String>) -> Self {
        self.stop_words_mode = Some(mode.into());
        self
    }

    pub fn stop_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop_words = words.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> Result<Schema> {
        if self.entity.is_empty() {
            return Err(OmError::Schema("Entity name must not be empty".into()));
        }

        let data_structure = match &self.data_structure {
            Some(value) => value.parse()?,
            None => DataStructure::default(),
        };
        let stop_words = match &self.stop_words_mode {
            Some(mode) => StopWords::from_mode(mode, self.stop_words)?,
            None => StopWords::default(),
        };

        let mut names = HashSet::new();
        let mut storage_names = HashSet::new();
        for (name, def) in &self.fields {
            if name.is_empty() {
                return Err(OmError::Schema(format!(
                    "Entity '{}' declares a field with an empty name",
                    self.entity
                )));
            }
            def.validate(name)?;
            if !names.insert(name.as_str()) {
                return Err(OmError::Schema(format!(
                    "Field '{name}' is declared more than once"
                )));
            }
            if !storage_names.insert(def.storage_name(name)) {
                return Err(OmError::Schema(format!(
                    "Storage name '{}' is used by more than one field",
                    def.storage_name(name)
                )));
            }
        }

        let index_name = self
            .index_name
            .unwrap_or_else(|| format!("{}:index", self.entity));
        let prefix = self.prefix.unwrap_or_else(|| self.entity.clone());

        Ok(Schema {
            entity: self.entity,
            fields: self.fields,
            data_structure,
            index_name,
            prefix,
            stop_words,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let schema = Schema::builder("album")
            .field("artist", FieldDefinition::new(FieldType::String))
            .build()
            .unwrap();

        assert_eq!(schema.data_structure(), DataStructure::Hash);
        assert_eq!(schema.index_name(), "album:index");
        assert_eq!(schema.prefix(), "album");
        assert_eq!(schema.stop_words(), &StopWords::Default);
        assert_eq!(schema.key_for("01ABC"), "album:01ABC");
        assert_eq!(schema.id_from_key("album:01ABC"), Some("01ABC"));
        assert_eq!(schema.id_from_key("track:01ABC"), None);
    }

    #[test]
    fn test_fields_keep_declaration_order() {
        let schema = Schema::builder("album")
            .field("title", FieldDefinition::new(FieldType::Text))
            .field("artist", FieldDefinition::new(FieldType::String))
            .field("year", FieldDefinition::new(FieldType::Number))
            .build()
            .unwrap();

        let names: Vec<&str> = schema.fields().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["title", "artist", "year"]);
    }

    #[test]
    fn test_invalid_data_structure() {
        let err = Schema::builder("album")
            .data_structure("XML")
            .build()
            .unwrap_err();
        match err {
            OmError::InvalidSchemaOption { option, value } => {
                assert_eq!(option, "data_structure");
                assert_eq!(value, "XML");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_stop_words_mode() {
        let err = Schema::builder("album")
            .use_stop_words("SOMETIMES")
            .build()
            .unwrap_err();
        assert!(matches!(err, OmError::InvalidSchemaOption { ref option, .. } if option == "use_stop_words"));
    }

    #[test]
    fn test_custom_stop_words() {
        let schema = Schema::builder("album")
            .data_structure("json")
            .use_stop_words("custom")
            .stop_words(["the", "a"])
            .build()
            .unwrap();
        assert_eq!(schema.data_structure(), DataStructure::Json);
        assert_eq!(
            schema.stop_words(),
            &StopWords::Custom(vec!["the".into(), "a".into()])
        );
    }

    #[test]
    fn test_empty_alias_rejected() {
        let err = Schema::builder("album")
            .field("artist", FieldDefinition::new(FieldType::String).with_alias(""))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("artist"));
    }

    #[test]
    fn test_separator_only_on_string_types() {
        let err = Schema::builder("album")
            .field("year", FieldDefinition::new(FieldType::Number).with_separator(","))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("separator"));

        let schema = Schema::builder("album")
            .field("tags", FieldDefinition::new(FieldType::StringArray).with_separator(","))
            .build()
            .unwrap();
        assert_eq!(schema.field("tags").unwrap().separator(), ",");
    }

    #[test]
    fn test_duplicate_storage_name_rejected() {
        let err = Schema::builder("album")
            .field("artist", FieldDefinition::new(FieldType::String))
            .field("band", FieldDefinition::new(FieldType::String).with_alias("artist"))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("artist"));
    }

    #[test]
    fn test_resolve_unknown_field() {
        let schema = Schema::builder("album").build().unwrap();
        assert!(matches!(
            schema.resolve("nope"),
            Err(OmError::UnknownField { ref field }) if field == "nope"
        ));
    }

    #[test]
    fn test_point_cannot_be_sortable() {
        let err = Schema::builder("store")
            .field("location", FieldDefinition::new(FieldType::Point).with_sortable(true))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("sortable"));
    }
}
