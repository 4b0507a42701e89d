use crate::error::{OmError, Result};
use super::types::{FieldDefinition, Schema};
use serde::Deserialize;
use std::path::Path;

/// On-disk layout of a schema YAML file
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaFile {
    entity: String,
    #[serde(default)]
    data_structure: Option<String>,
    #[serde(default)]
    index_name: Option<String>,
    #[serde(default)]
    prefix: Option<String>,
    #[serde(default)]
    use_stop_words: Option<String>,
    #[serde(default)]
    stop_words: Vec<String>,
    /// Kept as a mapping so declaration order survives parsing
    #[serde(default)]
    fields: serde_yaml::Mapping,
}

/// Parse a schema YAML file into a Schema
pub fn parse_schema(path: &Path) -> Result<Schema> {
    let content = std::fs::read_to_string(path)?;
    parse_schema_str(&content)
}

/// Parse a schema YAML string into a Schema
pub fn parse_schema_str(content: &str) -> Result<Schema> {
    let file: SchemaFile = serde_yaml::from_str(content)?;

    let mut builder = Schema::builder(file.entity);
    if let Some(data_structure) = file.data_structure {
        builder = builder.data_structure(data_structure);
    }
    if let Some(index_name) = file.index_name {
        builder = builder.index_name(index_name);
    }
    if let Some(prefix) = file.prefix {
        builder = builder.prefix(prefix);
    }
    if let Some(mode) = file.use_stop_words {
        builder = builder.use_stop_words(mode);
    }
    builder = builder.stop_words(file.stop_words);

    for (key, value) in file.fields {
        let name = match key {
            serde_yaml::Value::String(name) => name,
            other => {
                return Err(OmError::Schema(format!(
                    "Field names must be strings, got {other:?}"
                )))
            }
        };
        let definition: FieldDefinition = serde_yaml::from_value(value)
            .map_err(|e| OmError::Schema(format!("Field '{name}': {e}")))?;
        builder = builder.field(name, definition);
    }

    builder.build()
}
