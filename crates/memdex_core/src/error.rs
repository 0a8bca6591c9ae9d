//! Error types for memdex core.

use memdex_codec::{CodecError, Value};
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store and query operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    /// Malformed predicate arguments.
    #[error("invalid value: {message}")]
    Value {
        /// Description of the malformed argument.
        message: String,
    },

    /// Operation not permitted in the current query mode or phase.
    #[error("invalid action: {message}")]
    Action {
        /// Description of why the action is invalid.
        message: String,
    },

    /// An operator/operand combination the residual evaluator cannot handle.
    #[error("unsupported filter: {message}")]
    Filter {
        /// Description of the unsupported filter.
        message: String,
    },

    /// Document does not satisfy the store schema.
    #[error("invalid document: {message}")]
    InvalidDocument {
        /// Description of the schema violation.
        message: String,
    },

    /// A primary key or unique index value is already taken.
    #[error("duplicate value {value} for unique field {field}")]
    DuplicateKey {
        /// The unique field.
        field: String,
        /// The colliding value.
        value: Value,
    },

    /// Indexes and documents disagree.
    #[error("store corrupted: {message}")]
    Corrupted {
        /// Description of the inconsistency.
        message: String,
    },

    /// Snapshot encoding or decoding error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

impl StoreError {
    /// Creates a value error.
    pub fn value(message: impl Into<String>) -> Self {
        Self::Value {
            message: message.into(),
        }
    }

    /// Creates an action error.
    pub fn action(message: impl Into<String>) -> Self {
        Self::Action {
            message: message.into(),
        }
    }

    /// Creates a filter error.
    pub fn filter(message: impl Into<String>) -> Self {
        Self::Filter {
            message: message.into(),
        }
    }

    /// Creates an invalid document error.
    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }

    /// Creates a duplicate key error.
    pub fn duplicate_key(field: impl Into<String>, value: Value) -> Self {
        Self::DuplicateKey {
            field: field.into(),
            value,
        }
    }

    /// Creates a corruption error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted {
            message: message.into(),
        }
    }
}
