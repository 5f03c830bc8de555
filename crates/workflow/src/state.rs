//! Workflow execution state machine.

use serde::{Deserialize, Serialize};

/// The state of a workflow execution.
///
/// State transitions:
/// ```text
/// NotStarted ──► Running ──┬──► Completed
///                          └──► Compensating ──► Failed
/// ```
///
/// A workflow rejected by validation goes from `Running` straight to
/// `Failed`, since no step ran and there is nothing to unwind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum WorkflowState {
    /// The execution has not started yet.
    #[default]
    NotStarted,

    /// Steps are being executed.
    Running,

    /// A step failed and completed steps are being undone.
    Compensating,

    /// All steps completed successfully (terminal state).
    Completed,

    /// The workflow failed (terminal state).
    Failed,
}

impl WorkflowState {
    /// Returns true if the execution can begin running.
    pub fn can_run(&self) -> bool {
        matches!(self, WorkflowState::NotStarted)
    }

    /// Returns true if the execution can begin compensation.
    pub fn can_compensate(&self) -> bool {
        matches!(self, WorkflowState::Running)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowState::Completed | WorkflowState::Failed)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::NotStarted => "NotStarted",
            WorkflowState::Running => "Running",
            WorkflowState::Compensating => "Compensating",
            WorkflowState::Completed => "Completed",
            WorkflowState::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
