use thiserror::Error;

use crate::{RecordId, Version};

/// Errors that can occur when interacting with the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with the same id or unique key already exists.
    #[error("Duplicate {entity_type}: {key} '{value}' is already taken")]
    DuplicateKey {
        entity_type: String,
        key: String,
        value: String,
    },

    /// The addressed record does not exist.
    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: String, id: RecordId },

    /// A record references another record that does not exist.
    #[error("Referenced {entity_type} does not exist: {id}")]
    MissingReference { entity_type: String, id: RecordId },

    /// The record cannot be deleted while other records reference it.
    #[error("{entity_type} {id} is still referenced by a {by_type}")]
    Referenced {
        entity_type: String,
        id: RecordId,
        by_type: String,
    },

    /// The expected version did not match the stored version.
    #[error(
        "Concurrency conflict for {entity_type} {id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        entity_type: String,
        id: RecordId,
        expected: Version,
        actual: Version,
    },

    /// The record is malformed.
    #[error("Invalid record: {0}")]
    Validation(String),

    /// The store could not be reached or refused service.
    #[error("Record store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Shorthand for a [`StoreError::NotFound`].
    pub fn not_found(entity_type: impl Into<String>, id: RecordId) -> Self {
        StoreError::NotFound {
            entity_type: entity_type.into(),
            id,
        }
    }
}

/// Result type for record store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
