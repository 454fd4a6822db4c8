//! Error types for taskgate-store

use thiserror::Error;

/// Errors that can occur in the audit persistence layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// No record with the given audit id exists
    #[error("audit record not found: {audit_id}")]
    NotFound { audit_id: String },

    /// A record with the same audit id was already inserted
    #[error("audit record already exists: {audit_id}")]
    Duplicate { audit_id: String },

    /// Backend connection or query failure
    #[error("storage backend error: {0}")]
    Backend(String),

    /// Payload could not be encoded or decoded
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl From<surrealdb::Error> for StorageError {
    fn from(err: surrealdb::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}
