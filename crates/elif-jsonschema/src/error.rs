use thiserror::Error;

/// Result type for schema reflection
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors that can occur while reflecting a type into a JSON Schema
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A field annotation term could not be interpreted
    #[error("invalid annotation on {type_name}.{field}: `{term}` ({reason})")]
    InvalidAnnotation {
        type_name: String,
        field: String,
        term: String,
        reason: String,
    },

    /// The root type is not object-like
    #[error("invalid root type {0}: only records, maps and custom schemas can be reflected")]
    InvalidRootType(String),

    /// A field type has no schema classification and no override
    #[error("unsupported type for {type_name}.{field}: {reason}")]
    UnsupportedType {
        type_name: String,
        field: String,
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error while reading configuration
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SchemaError {
    /// Create a new invalid annotation error
    pub fn annotation_error<T: ToString>(
        type_name: &str,
        field: &str,
        term: &str,
        reason: T,
    ) -> Self {
        Self::InvalidAnnotation {
            type_name: type_name.to_string(),
            field: field.to_string(),
            term: term.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a new unsupported type error
    pub fn unsupported_error<T: ToString>(type_name: &str, field: &str, reason: T) -> Self {
        Self::UnsupportedType {
            type_name: type_name.to_string(),
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a new configuration error
    pub fn config_error<T: ToString>(msg: T) -> Self {
        Self::Config(msg.to_string())
    }
}

impl From<toml::de::Error> for SchemaError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}
