//! Workflow error types.

use record_store::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by workflows and their steps.
///
/// Errors are cloneable so the error of the first failing step can be kept
/// and handed back unchanged after compensation has run.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum WorkflowError {
    /// Input failed a precondition.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A create or update collided with a unique key.
    #[error("Duplicate {entity}: {key} '{value}' already exists")]
    DuplicateEntity {
        entity: String,
        key: String,
        value: String,
    },

    /// The targeted record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The record changed underneath the step, or is still in use.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Undoing a completed step failed.
    #[error("Compensation of step '{step}' failed: {reason}")]
    CompensationFailure { step: String, reason: String },

    /// The record store could not serve the request.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Discriminant of a [`WorkflowError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    DuplicateEntity,
    NotFound,
    Conflict,
    CompensationFailure,
    StoreUnavailable,
}

impl ErrorKind {
    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::DuplicateEntity => "duplicate_entity",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::CompensationFailure => "compensation_failure",
            ErrorKind::StoreUnavailable => "store_unavailable",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl WorkflowError {
    /// Shorthand for a [`WorkflowError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        WorkflowError::Validation(message.into())
    }

    /// Shorthand for a [`WorkflowError::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl std::fmt::Display) -> Self {
        WorkflowError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::Validation(_) => ErrorKind::Validation,
            WorkflowError::DuplicateEntity { .. } => ErrorKind::DuplicateEntity,
            WorkflowError::NotFound { .. } => ErrorKind::NotFound,
            WorkflowError::Conflict(_) => ErrorKind::Conflict,
            WorkflowError::CompensationFailure { .. } => ErrorKind::CompensationFailure,
            WorkflowError::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
        }
    }
}

impl From<StoreError> for WorkflowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey {
                entity_type,
                key,
                value,
            } => WorkflowError::DuplicateEntity {
                entity: entity_type,
                key,
                value,
            },
            StoreError::NotFound { entity_type, id }
            | StoreError::MissingReference { entity_type, id } => {
                WorkflowError::not_found(entity_type, id)
            }
            err @ (StoreError::Referenced { .. } | StoreError::ConcurrencyConflict { .. }) => {
                WorkflowError::Conflict(err.to_string())
            }
            StoreError::Validation(message) => WorkflowError::Validation(message),
            StoreError::Unavailable(message) => WorkflowError::StoreUnavailable(message),
            other => WorkflowError::StoreUnavailable(other.to_string()),
        }
    }
}

/// Convenience type alias for workflow results.
pub type Result<T> = std::result::Result<T, WorkflowError>;
