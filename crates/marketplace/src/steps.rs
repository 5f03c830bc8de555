//! Store steps shared by the marketplace workflows.
//!
//! Each step performs a single store write, so a failed step leaves nothing
//! behind and only completed steps need undoing.

use std::marker::PhantomData;

use async_trait::async_trait;
use record_store::{Entity, EntityStoreExt, RecordId, RecordStore, StoreError, Version};
use workflow::{Result, Step, StepResponse};

use crate::context::MarketplaceContext;

/// An entity as it was read, with the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    pub entity: T,
    pub version: Version,
}

/// A change from a snapshot to a new state of the same entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Replacement<T> {
    pub previous: Snapshot<T>,
    pub next: T,
}

impl<T> Replacement<T> {
    pub fn new(previous: Snapshot<T>, next: T) -> Self {
        Self { previous, next }
    }
}

/// Removes an entity, treating an already-missing record as done.
pub(crate) async fn remove_if_present<S, T>(store: &S, id: RecordId) -> Result<()>
where
    S: RecordStore + ?Sized,
    T: Entity,
{
    match store.remove::<T>(id).await {
        Ok(()) | Err(StoreError::NotFound { .. }) => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Puts `previous` back, whether or not the record still exists.
pub(crate) async fn put_back<S, T>(store: &S, previous: &T) -> Result<()>
where
    S: RecordStore + ?Sized,
    T: Entity,
{
    match store.fetch::<T>(previous.id()).await? {
        Some(_) => store.replace(previous).await?,
        None => store.restore(previous).await?,
    };
    Ok(())
}

/// Reads an entity. Nothing to undo.
pub struct FetchEntity<T> {
    name: &'static str,
    _entity: PhantomData<fn() -> T>,
}

impl<T> FetchEntity<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<S, T> Step<MarketplaceContext<S>> for FetchEntity<T>
where
    S: RecordStore + 'static,
    T: Entity,
{
    type Input = RecordId;
    type Output = Snapshot<T>;
    type Undo = ();

    fn name(&self) -> &'static str {
        self.name
    }

    async fn run(
        &self,
        id: RecordId,
        ctx: &MarketplaceContext<S>,
    ) -> Result<StepResponse<Snapshot<T>, ()>> {
        let (entity, version) = ctx
            .store()
            .fetch_versioned::<T>(id)
            .await?
            .ok_or_else(|| StoreError::not_found(T::ENTITY_TYPE, id))?;
        Ok(StepResponse::new(Snapshot { entity, version }))
    }
}

/// Stores a new entity. Undo deletes it again.
pub struct InsertEntity<T> {
    name: &'static str,
    _entity: PhantomData<fn() -> T>,
}

impl<T> InsertEntity<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<S, T> Step<MarketplaceContext<S>> for InsertEntity<T>
where
    S: RecordStore + 'static,
    T: Entity,
{
    type Input = T;
    type Output = T;
    type Undo = RecordId;

    fn name(&self) -> &'static str {
        self.name
    }

    async fn run(&self, entity: T, ctx: &MarketplaceContext<S>) -> Result<StepResponse<T, RecordId>> {
        let stored = ctx.store().insert(&entity).await?;
        let id = stored.id();
        tracing::debug!(entity_type = T::ENTITY_TYPE, %id, "entity created");
        Ok(StepResponse::with_undo(stored, id))
    }

    async fn compensate(&self, id: RecordId, ctx: &MarketplaceContext<S>) -> Result<()> {
        remove_if_present::<S, T>(ctx.store(), id).await
    }
}

/// Writes the new state of an entity if it is unchanged since the snapshot.
/// Undo writes the snapshot back.
pub struct ReplaceEntity<T> {
    name: &'static str,
    _entity: PhantomData<fn() -> T>,
}

impl<T> ReplaceEntity<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<S, T> Step<MarketplaceContext<S>> for ReplaceEntity<T>
where
    S: RecordStore + 'static,
    T: Entity,
{
    type Input = Replacement<T>;
    type Output = T;
    type Undo = T;

    fn name(&self) -> &'static str {
        self.name
    }

    async fn run(
        &self,
        replacement: Replacement<T>,
        ctx: &MarketplaceContext<S>,
    ) -> Result<StepResponse<T, T>> {
        let Replacement { previous, next } = replacement;
        let stored = ctx
            .store()
            .replace_if_version(&next, previous.version)
            .await?;
        Ok(StepResponse::with_undo(stored, previous.entity))
    }

    async fn compensate(&self, previous: T, ctx: &MarketplaceContext<S>) -> Result<()> {
        put_back(ctx.store(), &previous).await
    }
}

/// Deletes an entity. Undo restores it under its original id.
pub struct DeleteEntity<T> {
    name: &'static str,
    _entity: PhantomData<fn() -> T>,
}

impl<T> DeleteEntity<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<S, T> Step<MarketplaceContext<S>> for DeleteEntity<T>
where
    S: RecordStore + 'static,
    T: Entity,
{
    type Input = T;
    type Output = RecordId;
    type Undo = T;

    fn name(&self) -> &'static str {
        self.name
    }

    async fn run(&self, entity: T, ctx: &MarketplaceContext<S>) -> Result<StepResponse<RecordId, T>> {
        let id = entity.id();
        ctx.store().remove::<T>(id).await?;
        tracing::debug!(entity_type = T::ENTITY_TYPE, %id, "entity deleted");
        Ok(StepResponse::with_undo(id, entity))
    }

    async fn compensate(&self, entity: T, ctx: &MarketplaceContext<S>) -> Result<()> {
        ctx.store().restore(&entity).await?;
        Ok(())
    }
}
