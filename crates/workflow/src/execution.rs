//! Workflow execution record, rebuilt from journal events.

use chrono::{DateTime, Utc};
use common::ExecutionId;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, WorkflowError};
use crate::events::WorkflowEvent;
use crate::state::WorkflowState;

/// The recorded history of one workflow run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowExecution {
    id: Option<ExecutionId>,
    workflow: String,
    state: WorkflowState,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    current_step: usize,
    completed_steps: Vec<String>,
    failed_step: Option<String>,
    failure_reason: Option<String>,
    failure_kind: Option<ErrorKind>,
    compensated_steps: Vec<String>,
    skipped_compensations: Vec<String>,
    compensation_failures: Vec<WorkflowError>,
}

impl WorkflowExecution {
    /// Replays `events` into an execution.
    pub fn from_events(events: impl IntoIterator<Item = WorkflowEvent>) -> Self {
        let mut execution = Self::default();
        for event in events {
            execution.apply(event);
        }
        execution
    }

    /// Applies one event.
    pub fn apply(&mut self, event: WorkflowEvent) {
        match event {
            WorkflowEvent::WorkflowStarted(data) => {
                self.id = Some(data.execution_id);
                self.workflow = data.workflow;
                self.started_at = Some(data.started_at);
                self.state = WorkflowState::Running;
            }
            WorkflowEvent::StepStarted(_) => {
                self.current_step += 1;
            }
            WorkflowEvent::StepCompleted(data) => {
                self.completed_steps.push(data.step_name);
            }
            WorkflowEvent::StepFailed(data) => {
                self.failed_step = Some(data.step_name);
                self.failure_reason = Some(data.error);
            }
            WorkflowEvent::CompensationStarted(_) => {
                self.state = WorkflowState::Compensating;
            }
            WorkflowEvent::CompensationStepCompleted(data) => {
                self.compensated_steps.push(data.step_name);
            }
            WorkflowEvent::CompensationStepSkipped(data) => {
                self.skipped_compensations.push(data.step_name);
            }
            WorkflowEvent::CompensationStepFailed(data) => {
                // Unwinding continues; the failure is kept as a diagnostic
                self.compensation_failures
                    .push(WorkflowError::CompensationFailure {
                        step: data.step_name,
                        reason: data.error,
                    });
            }
            WorkflowEvent::WorkflowCompleted(data) => {
                self.state = WorkflowState::Completed;
                self.finished_at = Some(data.completed_at);
            }
            WorkflowEvent::WorkflowFailed(data) => {
                self.state = WorkflowState::Failed;
                self.failure_reason = Some(data.reason);
                self.failure_kind = Some(data.kind);
                self.finished_at = Some(data.failed_at);
            }
        }
    }
}

// Query methods
impl WorkflowExecution {
    pub fn id(&self) -> Option<ExecutionId> {
        self.id
    }

    /// Returns the workflow name.
    pub fn workflow(&self) -> &str {
        &self.workflow
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Returns the number of steps that were started.
    pub fn steps_started(&self) -> usize {
        self.current_step
    }

    /// Returns the names of completed steps, in execution order.
    pub fn completed_steps(&self) -> &[String] {
        &self.completed_steps
    }

    /// Returns the step that failed, if a step failed.
    pub fn failed_step(&self) -> Option<&str> {
        self.failed_step.as_deref()
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn failure_kind(&self) -> Option<ErrorKind> {
        self.failure_kind
    }

    /// Returns the steps that were undone, in unwind order.
    pub fn compensated_steps(&self) -> &[String] {
        &self.compensated_steps
    }

    /// Returns the completed steps that had nothing to undo.
    pub fn skipped_compensations(&self) -> &[String] {
        &self.skipped_compensations
    }

    /// Returns the compensation failures recorded during unwind.
    pub fn compensation_failures(&self) -> &[WorkflowError] {
        &self.compensation_failures
    }
}
