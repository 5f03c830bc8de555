//! Workflows and the per-execution step runner.

use std::marker::PhantomData;

use async_trait::async_trait;
use common::ExecutionId;

use crate::error::{Result, WorkflowError};
use crate::events::WorkflowEvent;
use crate::journal::ExecutionJournal;
use crate::step::{Step, StepResponse};

/// An ordered composition of steps sharing one input.
///
/// `execute` calls [`WorkflowRun::step`] for each step in turn and passes
/// outputs forward as ordinary values. It should return as soon as a step
/// fails; the executor takes care of the unwind.
#[async_trait]
pub trait Workflow<C: Send + Sync + 'static>: Send + Sync {
    type Input: Send + 'static;
    type Output: Send + 'static;

    /// Name used in logs, metrics and the execution journal.
    fn name(&self) -> &'static str;

    /// Checks the input before any step runs.
    fn validate(&self, _input: &Self::Input) -> Result<()> {
        Ok(())
    }

    /// Runs the steps.
    async fn execute(&self, input: Self::Input, run: &mut WorkflowRun<'_, C>)
    -> Result<Self::Output>;
}

/// Undo action of a completed step, bound to its token.
#[async_trait]
trait Compensator<C>: Send {
    async fn compensate(self: Box<Self>, ctx: &C) -> Result<()>;
}

struct PendingCompensation<S, U, C> {
    step: S,
    undo: U,
    _context: PhantomData<fn(&C)>,
}

#[async_trait]
impl<S, U, C> Compensator<C> for PendingCompensation<S, U, C>
where
    S: Step<C, Undo = U>,
    U: Send + 'static,
    C: Send + Sync + 'static,
{
    async fn compensate(self: Box<Self>, ctx: &C) -> Result<()> {
        let PendingCompensation { step, undo, .. } = *self;
        step.compensate(undo, ctx).await
    }
}

/// A step that ran to completion.
pub(crate) struct CompletedStep<C> {
    pub(crate) name: &'static str,
    compensator: Option<Box<dyn Compensator<C>>>,
}

impl<C: Send + Sync + 'static> CompletedStep<C> {
    /// Runs the undo action. Returns `None` if the step registered none.
    pub(crate) async fn compensate(self, ctx: &C) -> Option<Result<()>> {
        match self.compensator {
            Some(compensator) => Some(compensator.compensate(ctx).await),
            None => None,
        }
    }
}

/// State of one workflow execution.
///
/// Records completed steps with their undo tokens. Once a step has failed,
/// every later [`step`](Self::step) call returns that failure without
/// running anything.
pub struct WorkflowRun<'a, C> {
    ctx: &'a C,
    execution_id: ExecutionId,
    journal: &'a dyn ExecutionJournal,
    completed: Vec<CompletedStep<C>>,
    failure: Option<(&'static str, WorkflowError)>,
}

impl<'a, C: Send + Sync + 'static> WorkflowRun<'a, C> {
    pub(crate) fn new(
        ctx: &'a C,
        execution_id: ExecutionId,
        journal: &'a dyn ExecutionJournal,
    ) -> Self {
        Self {
            ctx,
            execution_id,
            journal,
            completed: Vec::new(),
            failure: None,
        }
    }

    /// Returns the shared context.
    pub fn context(&self) -> &C {
        self.ctx
    }

    pub fn execution_id(&self) -> ExecutionId {
        self.execution_id
    }

    /// Returns the names of the steps completed so far.
    pub fn completed_steps(&self) -> Vec<&'static str> {
        self.completed.iter().map(|step| step.name).collect()
    }

    /// Runs `step` with `input`.
    pub async fn step<S: Step<C>>(&mut self, step: S, input: S::Input) -> Result<S::Output> {
        if let Some((_, err)) = &self.failure {
            return Err(err.clone());
        }

        let name = step.name();
        tracing::info!(step = name, "workflow step started");
        self.journal
            .append(self.execution_id, WorkflowEvent::step_started(name))
            .await;

        match step.run(input, self.ctx).await {
            Ok(StepResponse { output, undo }) => {
                self.journal
                    .append(
                        self.execution_id,
                        WorkflowEvent::step_completed(name, undo.is_some()),
                    )
                    .await;
                tracing::info!(step = name, "workflow step completed");

                let compensator = undo.map(|undo| {
                    Box::new(PendingCompensation {
                        step,
                        undo,
                        _context: PhantomData,
                    }) as Box<dyn Compensator<C>>
                });
                self.completed.push(CompletedStep { name, compensator });
                Ok(output)
            }
            Err(err) => {
                self.journal
                    .append(
                        self.execution_id,
                        WorkflowEvent::step_failed(name, err.to_string()),
                    )
                    .await;
                tracing::warn!(step = name, error = %err, "workflow step failed");

                self.failure = Some((name, err.clone()));
                Err(err)
            }
        }
    }

    /// Splits the run into its completed steps and first step failure.
    pub(crate) fn finish(
        self,
    ) -> (Vec<CompletedStep<C>>, Option<(&'static str, WorkflowError)>) {
        (self.completed, self.failure)
    }
}
