//! Steps: named units of work with an optional undo.

use async_trait::async_trait;
use futures_util::future::BoxFuture;

use crate::error::Result;

/// What a step hands back on success.
///
/// `undo` is the token the step needs to reverse its own effect. A step that
/// returns no token is skipped during unwind.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResponse<O, U> {
    pub output: O,
    pub undo: Option<U>,
}

impl<O, U> StepResponse<O, U> {
    /// A response with nothing to undo.
    pub fn new(output: O) -> Self {
        Self { output, undo: None }
    }

    /// A response that registers `undo` for compensation.
    pub fn with_undo(output: O, undo: U) -> Self {
        Self {
            output,
            undo: Some(undo),
        }
    }
}

/// A unit of work run by a workflow.
///
/// Steps get their collaborators from the shared context `C` and keep no
/// state between invocations.
#[async_trait]
pub trait Step<C: Send + Sync + 'static>: Send + Sync + 'static {
    type Input: Send + 'static;
    type Output: Send + 'static;
    type Undo: Send + 'static;

    /// Name used in logs, metrics and the execution journal.
    fn name(&self) -> &'static str;

    /// Runs the forward action.
    async fn run(
        &self,
        input: Self::Input,
        ctx: &C,
    ) -> Result<StepResponse<Self::Output, Self::Undo>>;

    /// Reverses a completed run. Should be safe to call more than once.
    async fn compensate(&self, _undo: Self::Undo, _ctx: &C) -> Result<()> {
        Ok(())
    }
}

type RunFn<I, O, U, C> =
    Box<dyn for<'a> Fn(I, &'a C) -> BoxFuture<'a, Result<StepResponse<O, U>>> + Send + Sync>;
type CompensateFn<U, C> = Box<dyn for<'a> Fn(U, &'a C) -> BoxFuture<'a, Result<()>> + Send + Sync>;

/// A step assembled from closures.
///
/// ```ignore
/// let step = FnStep::new("create_listing", |listing: Listing, ctx: &Ctx| {
///     async move { ... }.boxed()
/// })
/// .with_compensation(|id, ctx: &Ctx| async move { ... }.boxed());
/// ```
pub struct FnStep<I, O, U, C> {
    name: &'static str,
    run: RunFn<I, O, U, C>,
    compensate: Option<CompensateFn<U, C>>,
}

impl<I, O, U, C> FnStep<I, O, U, C> {
    /// Creates a step with a forward action and no compensation.
    pub fn new<F>(name: &'static str, run: F) -> Self
    where
        F: for<'a> Fn(I, &'a C) -> BoxFuture<'a, Result<StepResponse<O, U>>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name,
            run: Box::new(run),
            compensate: None,
        }
    }

    /// Adds the compensation action.
    pub fn with_compensation<F>(mut self, compensate: F) -> Self
    where
        F: for<'a> Fn(U, &'a C) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
    {
        self.compensate = Some(Box::new(compensate));
        self
    }

    /// Returns true if a compensation action is set.
    pub fn has_compensation(&self) -> bool {
        self.compensate.is_some()
    }
}

#[async_trait]
impl<I, O, U, C> Step<C> for FnStep<I, O, U, C>
where
    I: Send + 'static,
    O: Send + 'static,
    U: Send + 'static,
    C: Send + Sync + 'static,
{
    type Input = I;
    type Output = O;
    type Undo = U;

    fn name(&self) -> &'static str {
        self.name
    }

    async fn run(&self, input: I, ctx: &C) -> Result<StepResponse<O, U>> {
        let mut response = (self.run)(input, ctx).await?;
        if self.compensate.is_none() {
            response.undo = None;
        }
        Ok(response)
    }

    async fn compensate(&self, undo: U, ctx: &C) -> Result<()> {
        match &self.compensate {
            Some(compensate) => compensate(undo, ctx).await,
            None => Ok(()),
        }
    }
}
