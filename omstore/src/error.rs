use thiserror::Error;

#[derive(Error, Debug)]
pub enum OmError {
    #[error("Type mismatch: field '{field}' is declared as {field_type}, got {value}")]
    TypeMismatch {
        field: String,
        field_type: String,
        value: String,
    },

    #[error("Decode error: field '{field}' has stored value {value:?} ({reason})")]
    Decode {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unknown field: '{field}' is not declared in the schema")]
    UnknownField { field: String },

    #[error("Unsupported field type: '{field}' is a {field_type} field and cannot be searched")]
    UnsupportedFieldType { field: String, field_type: String },

    #[error("Invalid operation: '{operation}' is not available on {field_type} field '{field}'")]
    InvalidOperation {
        field: String,
        field_type: String,
        operation: String,
    },

    #[error("Nested search produced no predicate")]
    EmptySubSearch,

    #[error("Invalid schema option: {option} = {value:?}")]
    InvalidSchemaOption { option: String, value: String },

    #[error("Malformed search result for key '{key}': {reason}")]
    MalformedResult { key: String, reason: String },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OmError>;
