//! Error types for record persistence.

use thiserror::Error;

/// Errors that can occur while saving or loading a record.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The container could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required attribute is missing from the record.
    #[error("missing attribute: {0}")]
    MissingAttr(String),

    /// An attribute holds a different type than the caller asked for.
    #[error("attribute {name} is not a {expected}")]
    WrongAttrType {
        name: String,
        expected: &'static str,
    },

    /// A required array is missing from the record.
    #[error("missing array: {0}")]
    MissingArray(String),

    /// An array holds a different dtype or rank than expected.
    #[error("array {name} is not {expected}")]
    WrongArrayType {
        name: String,
        expected: &'static str,
    },
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
