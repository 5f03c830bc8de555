//! Workflow execution events.

use chrono::{DateTime, Utc};
use common::ExecutionId;
use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// Events recorded while a workflow executes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WorkflowEvent {
    /// Execution started.
    WorkflowStarted(WorkflowStartedData),

    /// A step started.
    StepStarted(StepData),

    /// A step completed.
    StepCompleted(StepCompletedData),

    /// A step failed.
    StepFailed(StepFailedData),

    /// Unwinding started after a failure.
    CompensationStarted(CompensationData),

    /// A completed step was undone.
    CompensationStepCompleted(StepData),

    /// A completed step had nothing to undo.
    CompensationStepSkipped(StepData),

    /// Undoing a step failed (recorded, unwinding continues).
    CompensationStepFailed(StepFailedData),

    /// Execution completed successfully.
    WorkflowCompleted(WorkflowCompletedData),

    /// Execution failed.
    WorkflowFailed(WorkflowFailedData),
}

impl WorkflowEvent {
    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            WorkflowEvent::WorkflowStarted(_) => "WorkflowStarted",
            WorkflowEvent::StepStarted(_) => "StepStarted",
            WorkflowEvent::StepCompleted(_) => "StepCompleted",
            WorkflowEvent::StepFailed(_) => "StepFailed",
            WorkflowEvent::CompensationStarted(_) => "CompensationStarted",
            WorkflowEvent::CompensationStepCompleted(_) => "CompensationStepCompleted",
            WorkflowEvent::CompensationStepSkipped(_) => "CompensationStepSkipped",
            WorkflowEvent::CompensationStepFailed(_) => "CompensationStepFailed",
            WorkflowEvent::WorkflowCompleted(_) => "WorkflowCompleted",
            WorkflowEvent::WorkflowFailed(_) => "WorkflowFailed",
        }
    }
}

/// Data for WorkflowStarted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStartedData {
    pub execution_id: ExecutionId,
    /// The workflow name (e.g. "create-vendor").
    pub workflow: String,
    pub started_at: DateTime<Utc>,
}

/// Data for events that only carry a step name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepData {
    pub step_name: String,
}

/// Data for StepCompleted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepCompletedData {
    pub step_name: String,
    /// Whether the step registered an undo token.
    pub compensable: bool,
}

/// Data for StepFailed and CompensationStepFailed events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepFailedData {
    pub step_name: String,
    pub error: String,
}

/// Data for CompensationStarted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompensationData {
    /// The step whose failure triggered the unwind, if a step failed.
    pub from_step: Option<String>,
}

/// Data for WorkflowCompleted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowCompletedData {
    pub completed_at: DateTime<Utc>,
}

/// Data for WorkflowFailed event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowFailedData {
    pub reason: String,
    pub kind: ErrorKind,
    pub failed_at: DateTime<Utc>,
}

// Convenience constructors
impl WorkflowEvent {
    pub fn workflow_started(execution_id: ExecutionId, workflow: impl Into<String>) -> Self {
        WorkflowEvent::WorkflowStarted(WorkflowStartedData {
            execution_id,
            workflow: workflow.into(),
            started_at: Utc::now(),
        })
    }

    pub fn step_started(step_name: impl Into<String>) -> Self {
        WorkflowEvent::StepStarted(StepData {
            step_name: step_name.into(),
        })
    }

    pub fn step_completed(step_name: impl Into<String>, compensable: bool) -> Self {
        WorkflowEvent::StepCompleted(StepCompletedData {
            step_name: step_name.into(),
            compensable,
        })
    }

    pub fn step_failed(step_name: impl Into<String>, error: impl Into<String>) -> Self {
        WorkflowEvent::StepFailed(StepFailedData {
            step_name: step_name.into(),
            error: error.into(),
        })
    }

    pub fn compensation_started(from_step: Option<String>) -> Self {
        WorkflowEvent::CompensationStarted(CompensationData { from_step })
    }

    pub fn compensation_step_completed(step_name: impl Into<String>) -> Self {
        WorkflowEvent::CompensationStepCompleted(StepData {
            step_name: step_name.into(),
        })
    }

    pub fn compensation_step_skipped(step_name: impl Into<String>) -> Self {
        WorkflowEvent::CompensationStepSkipped(StepData {
            step_name: step_name.into(),
        })
    }

    pub fn compensation_step_failed(
        step_name: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        WorkflowEvent::CompensationStepFailed(StepFailedData {
            step_name: step_name.into(),
            error: error.into(),
        })
    }

    pub fn workflow_completed() -> Self {
        WorkflowEvent::WorkflowCompleted(WorkflowCompletedData {
            completed_at: Utc::now(),
        })
    }

    pub fn workflow_failed(reason: impl Into<String>, kind: ErrorKind) -> Self {
        WorkflowEvent::WorkflowFailed(WorkflowFailedData {
            reason: reason.into(),
            kind,
            failed_at: Utc::now(),
        })
    }
}
