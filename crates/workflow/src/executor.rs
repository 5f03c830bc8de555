//! Workflow executor: runs workflows and unwinds them on failure.

use std::sync::Arc;

use common::ExecutionId;

use crate::error::{Result, WorkflowError};
use crate::events::WorkflowEvent;
use crate::execution::WorkflowExecution;
use crate::journal::{ExecutionJournal, InMemoryJournal};
use crate::workflow::{CompletedStep, Workflow, WorkflowRun};

/// Runs workflows against a shared context.
///
/// The context is the capability bundle every step receives: store handles
/// and other long-lived services, built once and shared by all executions.
/// Independent executions may run concurrently; steps within one execution
/// never do.
pub struct WorkflowExecutor<C> {
    context: Arc<C>,
    journal: Arc<dyn ExecutionJournal>,
}

impl<C> Clone for WorkflowExecutor<C> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
            journal: Arc::clone(&self.journal),
        }
    }
}

impl<C: Send + Sync + 'static> WorkflowExecutor<C> {
    /// Creates an executor that journals the most recent executions to memory.
    pub fn new(context: C) -> Self {
        Self::with_journal(context, Arc::new(InMemoryJournal::new()))
    }

    /// Creates an executor with a custom journal.
    pub fn with_journal(context: C, journal: Arc<dyn ExecutionJournal>) -> Self {
        Self {
            context: Arc::new(context),
            journal,
        }
    }

    /// Returns the shared context.
    pub fn context(&self) -> &C {
        &self.context
    }

    /// Returns the journal.
    pub fn journal(&self) -> &Arc<dyn ExecutionJournal> {
        &self.journal
    }

    /// Runs a workflow and returns its output or the first failure.
    pub async fn run<W: Workflow<C>>(&self, workflow: &W, input: W::Input) -> Result<W::Output> {
        self.run_tracked(workflow, input).await.1
    }

    /// Runs a workflow and also returns the id its execution was journaled under.
    ///
    /// On failure, completed steps are compensated in reverse order before
    /// returning. Compensation failures are logged and journaled; the error
    /// returned is always the one that stopped the workflow.
    #[tracing::instrument(skip_all, fields(workflow = workflow.name(), execution_id = tracing::field::Empty))]
    pub async fn run_tracked<W: Workflow<C>>(
        &self,
        workflow: &W,
        input: W::Input,
    ) -> (ExecutionId, Result<W::Output>) {
        let name = workflow.name();
        let execution_id = ExecutionId::new();
        tracing::Span::current().record("execution_id", tracing::field::display(execution_id));

        metrics::counter!("workflow_executions_total", "workflow" => name).increment(1);
        let started = std::time::Instant::now();

        self.journal
            .append(
                execution_id,
                WorkflowEvent::workflow_started(execution_id, name),
            )
            .await;

        // Nothing has run yet, so there is nothing to unwind
        if let Err(err) = workflow.validate(&input) {
            self.record_failure(execution_id, name, &err, started).await;
            return (execution_id, Err(err));
        }

        let mut run = WorkflowRun::new(&*self.context, execution_id, &*self.journal);
        let result = workflow.execute(input, &mut run).await;
        let (completed, failure) = run.finish();

        // The first step failure wins, even if the body replaced or ignored it
        let (failed_step, result) = match (result, failure) {
            (_, Some((step, err))) => (Some(step), Err(err)),
            (result, None) => (None, result),
        };

        match result {
            Ok(output) => {
                self.journal
                    .append(execution_id, WorkflowEvent::workflow_completed())
                    .await;

                let duration = started.elapsed().as_secs_f64();
                metrics::histogram!("workflow_duration_seconds", "workflow" => name)
                    .record(duration);
                metrics::counter!("workflow_completed_total", "workflow" => name).increment(1);
                tracing::info!(%execution_id, duration, "workflow completed");

                (execution_id, Ok(output))
            }
            Err(err) => {
                self.unwind(execution_id, name, failed_step, completed)
                    .await;
                self.record_failure(execution_id, name, &err, started).await;
                (execution_id, Err(err))
            }
        }
    }

    /// Loads the journaled execution with the given id.
    pub async fn execution(&self, execution_id: ExecutionId) -> Option<WorkflowExecution> {
        self.journal.load(execution_id).await
    }

    /// Compensates completed steps in reverse order.
    async fn unwind(
        &self,
        execution_id: ExecutionId,
        workflow: &'static str,
        failed_step: Option<&'static str>,
        completed: Vec<CompletedStep<C>>,
    ) {
        self.journal
            .append(
                execution_id,
                WorkflowEvent::compensation_started(failed_step.map(str::to_string)),
            )
            .await;

        for step in completed.into_iter().rev() {
            let step_name = step.name;
            match step.compensate(&self.context).await {
                None => {
                    tracing::debug!(step = step_name, "nothing to compensate");
                    self.journal
                        .append(
                            execution_id,
                            WorkflowEvent::compensation_step_skipped(step_name),
                        )
                        .await;
                }
                Some(Ok(())) => {
                    metrics::counter!("workflow_compensations_total", "workflow" => workflow)
                        .increment(1);
                    tracing::info!(step = step_name, "step compensated");
                    self.journal
                        .append(
                            execution_id,
                            WorkflowEvent::compensation_step_completed(step_name),
                        )
                        .await;
                }
                Some(Err(err)) => {
                    metrics::counter!("workflow_compensations_total", "workflow" => workflow)
                        .increment(1);
                    metrics::counter!(
                        "workflow_compensation_failures_total",
                        "workflow" => workflow
                    )
                    .increment(1);
                    let diagnostic = WorkflowError::CompensationFailure {
                        step: step_name.to_string(),
                        reason: err.to_string(),
                    };
                    tracing::error!(%execution_id, error = %diagnostic, "compensation failed");
                    self.journal
                        .append(
                            execution_id,
                            WorkflowEvent::compensation_step_failed(step_name, err.to_string()),
                        )
                        .await;
                }
            }
        }
    }

    async fn record_failure(
        &self,
        execution_id: ExecutionId,
        workflow: &'static str,
        err: &WorkflowError,
        started: std::time::Instant,
    ) {
        self.journal
            .append(
                execution_id,
                WorkflowEvent::workflow_failed(err.to_string(), err.kind()),
            )
            .await;

        metrics::histogram!("workflow_duration_seconds", "workflow" => workflow)
            .record(started.elapsed().as_secs_f64());
        metrics::counter!("workflow_failed_total", "workflow" => workflow).increment(1);
        tracing::warn!(%execution_id, kind = %err.kind(), error = %err, "workflow failed");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use futures_util::FutureExt;

    use super::*;
    use crate::state::WorkflowState;
    use crate::step::{FnStep, StepResponse};

    /// Records every forward and compensation call.
    #[derive(Default)]
    struct Calls {
        log: Mutex<Vec<String>>,
    }

    impl Calls {
        fn push(&self, entry: impl Into<String>) {
            self.log.lock().unwrap().push(entry.into());
        }

        fn entries(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    fn recording_step(name: &'static str) -> FnStep<(), (), String, Calls> {
        FnStep::new(name, move |_, calls: &Calls| {
            async move {
                calls.push(format!("run:{name}"));
                Ok(StepResponse::with_undo((), name.to_string()))
            }
            .boxed()
        })
        .with_compensation(|undo, calls: &Calls| {
            async move {
                calls.push(format!("undo:{undo}"));
                Ok(())
            }
            .boxed()
        })
    }

    fn failing_step(name: &'static str, err: WorkflowError) -> FnStep<(), (), (), Calls> {
        FnStep::new(name, move |_, calls: &Calls| {
            let err = err.clone();
            async move {
                calls.push(format!("run:{name}"));
                Err(err)
            }
            .boxed()
        })
    }

    /// Runs the given steps in order, stopping at the first failure.
    struct Sequence {
        steps: Vec<&'static str>,
        fail_at: Option<usize>,
        reject_input: bool,
    }

    #[async_trait]
    impl Workflow<Calls> for Sequence {
        type Input = ();
        type Output = usize;

        fn name(&self) -> &'static str {
            "sequence"
        }

        fn validate(&self, _input: &()) -> Result<()> {
            if self.reject_input {
                return Err(WorkflowError::validation("input rejected"));
            }
            Ok(())
        }

        async fn execute(&self, _input: (), run: &mut WorkflowRun<'_, Calls>) -> Result<usize> {
            for i in 0..self.steps.len() {
                let name = self.steps[i];
                if self.fail_at == Some(i) {
                    let step = failing_step(name, WorkflowError::not_found("vendor", "v-1"));
                    run.step(step, ()).await?;
                } else {
                    let step = recording_step(name);
                    run.step(step, ()).await?;
                }
            }
            Ok(self.steps.len())
        }
    }

    #[tokio::test]
    async fn success_runs_every_step_without_compensation() {
        let executor = WorkflowExecutor::new(Calls::default());
        let workflow = Sequence {
            steps: vec!["a", "b", "c"],
            fail_at: None,
            reject_input: false,
        };

        let (id, result) = executor.run_tracked(&workflow, ()).await;

        assert_eq!(result, Ok(3));
        assert_eq!(executor.context().entries(), vec!["run:a", "run:b", "run:c"]);

        let execution = executor.execution(id).await.unwrap();
        assert_eq!(execution.state(), WorkflowState::Completed);
        assert_eq!(execution.completed_steps(), &["a", "b", "c"]);
    }

    #[tokio::test]
    async fn failure_unwinds_in_reverse_order() {
        let executor = WorkflowExecutor::new(Calls::default());
        let workflow = Sequence {
            steps: vec!["a", "b", "c", "d"],
            fail_at: Some(2),
            reject_input: false,
        };

        let (id, result) = executor.run_tracked(&workflow, ()).await;

        assert_eq!(result, Err(WorkflowError::not_found("vendor", "v-1")));
        assert_eq!(
            executor.context().entries(),
            vec!["run:a", "run:b", "run:c", "undo:b", "undo:a"]
        );

        let execution = executor.execution(id).await.unwrap();
        assert_eq!(execution.state(), WorkflowState::Failed);
        assert_eq!(execution.failed_step(), Some("c"));
        assert_eq!(execution.compensated_steps(), &["b", "a"]);
    }

    #[tokio::test]
    async fn validation_failure_runs_no_steps() {
        let executor = WorkflowExecutor::new(Calls::default());
        let workflow = Sequence {
            steps: vec!["a"],
            fail_at: None,
            reject_input: true,
        };

        let (id, result) = executor.run_tracked(&workflow, ()).await;

        assert_eq!(result, Err(WorkflowError::validation("input rejected")));
        assert!(executor.context().entries().is_empty());

        let execution = executor.execution(id).await.unwrap();
        assert_eq!(execution.state(), WorkflowState::Failed);
        assert_eq!(execution.steps_started(), 0);
    }

    /// Swallows the error of its only step.
    struct IgnoresErrors;

    #[async_trait]
    impl Workflow<Calls> for IgnoresErrors {
        type Input = ();
        type Output = ();

        fn name(&self) -> &'static str {
            "ignores-errors"
        }

        async fn execute(&self, _input: (), run: &mut WorkflowRun<'_, Calls>) -> Result<()> {
            let a = recording_step("a");
            run.step(a, ()).await?;
            let b = failing_step("b", WorkflowError::Conflict("stale".into()));
            let _ = run.step(b, ()).await;
            let c = recording_step("c");
            let _ = run.step(c, ()).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn swallowed_step_failure_still_fails_the_workflow() {
        let executor = WorkflowExecutor::new(Calls::default());

        let result = executor.run(&IgnoresErrors, ()).await;

        assert_eq!(result, Err(WorkflowError::Conflict("stale".into())));
        assert_eq!(
            executor.context().entries(),
            vec!["run:a", "run:b", "undo:a"]
        );
    }
}
