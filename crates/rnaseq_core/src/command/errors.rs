//! Command construction errors.

use thiserror::Error;

/// A setting that cannot be turned into a valid command.
///
/// Raised while commands are built, before any process is spawned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Unsupported index type '{0}' (expected .gtf or .gff)")]
    UnsupportedIndexType(String),

    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl ConfigurationError {
    pub fn unsupported_index_type(index_type: impl Into<String>) -> Self {
        Self::UnsupportedIndexType(index_type.into())
    }

    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub type ConfigurationResult<T> = Result<T, ConfigurationError>;
