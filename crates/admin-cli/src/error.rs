//! CLI error types.

use record_store::StoreError;
use thiserror::Error;
use workflow::{ErrorKind, WorkflowError};

/// Errors that end a CLI command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The database could not be reached.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The record store failed outside a workflow (migrations, queries).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A marketplace workflow failed.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// The named record does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Writing command output failed.
    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),
}

/// Convenience type alias for CLI results.
pub type Result<T> = std::result::Result<T, CliError>;

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Config(_) => 2,
            CliError::NotFound(_) => 3,
            CliError::Workflow(err) => match err.kind() {
                ErrorKind::Validation => 2,
                ErrorKind::NotFound => 3,
                ErrorKind::DuplicateEntity | ErrorKind::Conflict => 4,
                ErrorKind::CompensationFailure | ErrorKind::StoreUnavailable => 1,
            },
            CliError::Database(_) | CliError::Store(_) | CliError::Output(_) => 1,
        }
    }
}
