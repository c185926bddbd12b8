//! Error types and result types for gateway store operations.
//!
//! Use [`StoreResult<T>`] as the return type for fallible operations. Malformed
//! identifiers in optional fields are never errors (they pass through unchanged);
//! only the strict primary-key parse produces [`StoreError::InvalidIdentifier`].

use thiserror::Error;

/// Represents all possible errors that can occur when running an operation against a store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Error during store initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// A primary key could not be parsed as a native identifier.
    #[error("'{0}' is not a valid ObjectId, it must be a 12-byte input or a 24-character hex string")]
    InvalidIdentifier(String),
    /// The collection name is not acceptable to the store.
    #[error("Invalid collection name: {0}")]
    InvalidCollection(String),
    /// The document violates structural constraints.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// The filter or find options could not be interpreted.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    /// A document with the same `_id` already exists.
    /// The first argument is the key, the second is the collection name.
    #[error("E11000 duplicate key error collection: {1} dup key: {{ _id: {0} }}")]
    DuplicateKey(String, String),
    /// An error occurred in the underlying storage backend.
    #[error("{0}")]
    Backend(String),
}

/// A specialized `Result` type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
