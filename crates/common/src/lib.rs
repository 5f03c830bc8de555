//! Shared types for the marketplace workspace.

pub mod types;

pub use types::{ExecutionId, ParseRecordIdError, RecordId};
