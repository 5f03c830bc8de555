//! Compensating step executor.
//!
//! A [`Workflow`] runs an ordered list of [`Step`]s against a shared context.
//! Each step may hand back an undo token; if a later step fails, the
//! [`WorkflowExecutor`] undoes the completed steps in reverse order and
//! returns the error of the step that failed.
//!
//! This is a best-effort saga, not a two-phase commit: a crash between a
//! step committing and the executor recording it can leave orphaned state.
//! Every execution is recorded in an [`ExecutionJournal`] so such runs can be
//! found afterwards.

pub mod error;
pub mod events;
pub mod execution;
pub mod executor;
pub mod journal;
pub mod state;
pub mod step;
pub mod workflow;

pub use common::ExecutionId;
pub use error::{ErrorKind, Result, WorkflowError};
pub use events::WorkflowEvent;
pub use execution::WorkflowExecution;
pub use executor::WorkflowExecutor;
pub use journal::{DEFAULT_JOURNAL_CAPACITY, ExecutionJournal, InMemoryJournal};
pub use state::WorkflowState;
pub use step::{FnStep, Step, StepResponse};
pub use workflow::{Workflow, WorkflowRun};
