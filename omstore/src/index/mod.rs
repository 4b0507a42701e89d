// Search index declarations derived from a schema

use crate::schema::{DataStructure, FieldDefinition, FieldType, Schema, StopWords};

/// One field's arguments in an index-creation command, e.g. `["year", "NUMERIC", "SORTABLE"]`.
pub type FieldDeclaration = Vec<String>;

/// Index search type for a field type; `None` when the type is not indexable.
pub fn search_type(field_type: FieldType) -> Option<&'static str> {
    match field_type {
        FieldType::Number | FieldType::Date => Some("NUMERIC"),
        FieldType::Boolean | FieldType::String | FieldType::StringArray => Some("TAG"),
        FieldType::Text => Some("TEXT"),
        FieldType::Point => Some("GEO"),
        FieldType::OpaqueObject => None,
    }
}

/// Whether a field takes part in the index (and can therefore be searched).
pub fn is_searchable(definition: &FieldDefinition) -> bool {
    definition.is_indexed() && search_type(definition.field_type()).is_some()
}

/// Build the index field declarations for `schema` in the given encoding.
///
/// Declarations follow schema declaration order. Unindexed fields and
/// opaque objects produce no declaration.
pub fn build(schema: &Schema, encoding: DataStructure) -> Vec<FieldDeclaration> {
    let mut declarations = Vec::new();

    for (name, definition) in schema.fields() {
        if !definition.is_indexed() {
            continue;
        }
        let Some(search_type) = search_type(definition.field_type()) else {
            log::debug!(
                "Field '{name}' of type {} is not indexable, skipping",
                definition.field_type()
            );
            continue;
        };

        let alias = definition.storage_name(name);
        let mut declaration: FieldDeclaration = match encoding {
            DataStructure::Hash => vec![alias.to_string()],
            DataStructure::Json => vec![json_path(definition, alias), "AS".into(), alias.to_string()],
        };
        declaration.push(search_type.to_string());
        declaration.extend(type_options(definition, encoding));
        declarations.push(declaration);
    }

    log::debug!(
        "Built {} index declarations for '{}' ({encoding})",
        declarations.len(),
        schema.entity_name()
    );
    declarations
}

fn json_path(definition: &FieldDefinition, alias: &str) -> String {
    match definition.field_type() {
        FieldType::StringArray => format!("$.{alias}[*]"),
        _ => format!("$.{alias}"),
    }
}

fn type_options(definition: &FieldDefinition, encoding: DataStructure) -> Vec<String> {
    let mut options = Vec::new();

    match definition.field_type() {
        FieldType::String => {
            options.push("SEPARATOR".to_string());
            options.push(definition.separator().to_string());
        }
        // Each JSON array element is indexed on its own, no separator needed
        FieldType::StringArray => {
            if encoding == DataStructure::Hash {
                options.push("SEPARATOR".to_string());
                options.push(definition.separator().to_string());
            }
        }
        FieldType::Number
        | FieldType::Boolean
        | FieldType::Text
        | FieldType::Point
        | FieldType::Date
        | FieldType::OpaqueObject => {}
    }

    if definition.is_sortable() {
        options.push("SORTABLE".to_string());
    }
    options
}

/// Everything needed to create the search index for a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDefinition {
    pub name: String,
    pub data_structure: DataStructure,
    /// Key prefix including the trailing `:`
    pub key_prefix: String,
    pub stop_words: StopWords,
    pub fields: Vec<FieldDeclaration>,
}

impl IndexDefinition {
    pub fn from_schema(schema: &Schema) -> Self {
        IndexDefinition {
            name: schema.index_name().to_string(),
            data_structure: schema.data_structure(),
            key_prefix: format!("{}:", schema.prefix()),
            stop_words: schema.stop_words().clone(),
            fields: build(schema, schema.data_structure()),
        }
    }

    /// Full argument list for the index-creation command.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            self.name.clone(),
            "ON".to_string(),
            self.data_structure.to_string(),
            "PREFIX".to_string(),
            "1".to_string(),
            self.key_prefix.clone(),
        ];

        match &self.stop_words {
            StopWords::Off => {
                args.push("STOPWORDS".to_string());
                args.push("0".to_string());
            }
            StopWords::Custom(words) => {
                args.push("STOPWORDS".to_string());
                args.push(words.len().to_string());
                args.extend(words.iter().cloned());
            }
            StopWords::Default => {}
        }

        args.push("SCHEMA".to_string());
        for field in &self.fields {
            args.extend(field.iter().cloned());
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_schema_str;
    use pretty_assertions::assert_eq;

    const SCHEMA: &str = r#"
entity: sample
fields:
  aString: { type: string }
  aNumber: { type: number, sortable: true }
  aBoolean: { type: boolean }
  someText: { type: text, alias: body }
  aPoint: { type: point }
  aDate: { type: date }
  someStrings: { type: string-array, separator: "," }
  anObject: { type: object }
  notes: { type: text, indexed: false }
"#;

    fn decl(parts: &[&str]) -> FieldDeclaration {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_hash_declarations() {
        let schema = parse_schema_str(SCHEMA).unwrap();
        assert_eq!(
            build(&schema, DataStructure::Hash),
            vec![
                decl(&["aString", "TAG", "SEPARATOR", "|"]),
                decl(&["aNumber", "NUMERIC", "SORTABLE"]),
                decl(&["aBoolean", "TAG"]),
                decl(&["body", "TEXT"]),
                decl(&["aPoint", "GEO"]),
                decl(&["aDate", "NUMERIC"]),
                decl(&["someStrings", "TAG", "SEPARATOR", ","]),
            ]
        );
    }

    #[test]
    fn test_json_declarations() {
        let schema = parse_schema_str(SCHEMA).unwrap();
        assert_eq!(
            build(&schema, DataStructure::Json),
            vec![
                decl(&["$.aString", "AS", "aString", "TAG", "SEPARATOR", "|"]),
                decl(&["$.aNumber", "AS", "aNumber", "NUMERIC", "SORTABLE"]),
                decl(&["$.aBoolean", "AS", "aBoolean", "TAG"]),
                decl(&["$.body", "AS", "body", "TEXT"]),
                decl(&["$.aPoint", "AS", "aPoint", "GEO"]),
                decl(&["$.aDate", "AS", "aDate", "NUMERIC"]),
                decl(&["$.someStrings[*]", "AS", "someStrings", "TAG"]),
            ]
        );
    }

    #[test]
    fn test_json_string_array_uses_wildcard_path() {
        let schema = parse_schema_str(
            "entity: post\ndata_structure: JSON\nfields:\n  tags: { type: string-array }\n",
        )
        .unwrap();
        assert_eq!(
            build(&schema, DataStructure::Json),
            vec![decl(&["$.tags[*]", "AS", "tags", "TAG"])]
        );
    }

    #[test]
    fn test_index_definition_args() {
        let schema = parse_schema_str(
            r#"
entity: album
data_structure: JSON
use_stop_words: CUSTOM
stop_words: [the, a]
fields:
  title: { type: text }
"#,
        )
        .unwrap();

        let definition = IndexDefinition::from_schema(&schema);
        assert_eq!(
            definition.to_args(),
            decl(&[
                "album:index", "ON", "JSON", "PREFIX", "1", "album:", "STOPWORDS", "2", "the",
                "a", "SCHEMA", "$.title", "AS", "title", "TEXT",
            ])
        );
    }

    #[test]
    fn test_stop_words_off() {
        let schema = parse_schema_str("entity: album\nuse_stop_words: \"OFF\"\n").unwrap();
        let args = IndexDefinition::from_schema(&schema).to_args();
        assert_eq!(
            args,
            decl(&["album:index", "ON", "HASH", "PREFIX", "1", "album:", "STOPWORDS", "0", "SCHEMA"])
        );
    }
}
