//! Typed access to records.
//!
//! An [`Entity`] knows its record type, the unique keys it claims and the
//! records it points at. [`EntityStoreExt`] layers typed operations over any
//! [`RecordStore`].

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    NewRecord, Record, RecordId, RecordQuery, RecordRef, RecordStore, RecordUpdate, Result,
    StoreError, UniqueKey, Version,
};

/// A domain type persisted as a record.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The record type this entity is stored under.
    const ENTITY_TYPE: &'static str;

    /// The entity's identifier, also used as the record id.
    fn id(&self) -> RecordId;

    /// Unique keys claimed by the entity in its current state.
    fn unique_keys(&self) -> Vec<UniqueKey> {
        Vec::new()
    }

    /// Records the entity points at in its current state.
    fn references(&self) -> Vec<RecordRef> {
        Vec::new()
    }

    /// Builds the record that stores this entity.
    fn to_new_record(&self) -> Result<NewRecord> {
        NewRecord::builder()
            .id(self.id())
            .entity_type(Self::ENTITY_TYPE)
            .fields(self)?
            .unique_keys(self.unique_keys())
            .references(self.references())
            .build()
    }

    /// Builds a full replacement of the stored record.
    fn to_update(&self) -> Result<RecordUpdate> {
        Ok(RecordUpdate::from_value(self)?
            .unique_keys(self.unique_keys())
            .references(self.references()))
    }

    /// Reads the entity back from a stored record.
    fn from_record(record: &Record) -> Result<Self> {
        if record.entity_type != Self::ENTITY_TYPE {
            return Err(StoreError::Validation(format!(
                "expected a {} record, got {}",
                Self::ENTITY_TYPE,
                record.entity_type
            )));
        }
        record.deserialize_fields()
    }

    /// A query over every record of this type.
    fn query() -> RecordQuery {
        RecordQuery::for_entity(Self::ENTITY_TYPE)
    }
}

/// Typed operations over a record store.
#[async_trait]
pub trait EntityStoreExt: RecordStore {
    /// Stores a new entity under its own id.
    async fn insert<T: Entity>(&self, entity: &T) -> Result<T> {
        let record = self.create(entity.to_new_record()?).await?;
        T::from_record(&record)
    }

    /// Puts a previously removed entity back under its original id.
    ///
    /// Succeeds without writing if an identical record is already stored, so
    /// replaying a restore is harmless.
    async fn restore<T: Entity>(&self, entity: &T) -> Result<T> {
        if let Some(existing) = self.get(T::ENTITY_TYPE, entity.id()).await?
            && existing.fields == serde_json::to_value(entity)?
        {
            return T::from_record(&existing);
        }
        self.insert(entity).await
    }

    /// Fetches an entity by id.
    async fn fetch<T: Entity>(&self, id: RecordId) -> Result<Option<T>> {
        match self.get(T::ENTITY_TYPE, id).await? {
            Some(record) => Ok(Some(T::from_record(&record)?)),
            None => Ok(None),
        }
    }

    /// Fetches an entity by id, failing with `NotFound` if it does not exist.
    async fn fetch_required<T: Entity>(&self, id: RecordId) -> Result<T> {
        self.fetch(id)
            .await?
            .ok_or_else(|| StoreError::not_found(T::ENTITY_TYPE, id))
    }

    /// Fetches an entity together with the version it is stored at.
    async fn fetch_versioned<T: Entity>(&self, id: RecordId) -> Result<Option<(T, Version)>> {
        match self.get(T::ENTITY_TYPE, id).await? {
            Some(record) => Ok(Some((T::from_record(&record)?, record.version))),
            None => Ok(None),
        }
    }

    /// Overwrites the stored entity with `entity`.
    async fn replace<T: Entity>(&self, entity: &T) -> Result<T> {
        let record = self
            .update(T::ENTITY_TYPE, entity.id(), entity.to_update()?)
            .await?;
        T::from_record(&record)
    }

    /// Overwrites the stored entity only if it is still at `version`.
    async fn replace_if_version<T: Entity>(&self, entity: &T, version: Version) -> Result<T> {
        let update = entity.to_update()?.expect_version(version);
        let record = self.update(T::ENTITY_TYPE, entity.id(), update).await?;
        T::from_record(&record)
    }

    /// Deletes an entity by id.
    async fn remove<T: Entity>(&self, id: RecordId) -> Result<()> {
        self.delete(T::ENTITY_TYPE, id).await
    }

    /// Lists entities matching `query`.
    async fn find<T: Entity>(&self, query: RecordQuery) -> Result<Vec<T>> {
        self.list(query)
            .await?
            .iter()
            .map(T::from_record)
            .collect()
    }
}

impl<S: RecordStore + ?Sized> EntityStoreExt for S {}
