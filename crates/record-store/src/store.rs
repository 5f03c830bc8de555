use async_trait::async_trait;

use crate::{NewRecord, Record, RecordId, RecordQuery, RecordUpdate, Result, StoreError};

/// The operations a record store exposes, used for logging and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    Create,
    Update,
    Delete,
    Get,
    List,
}

impl StoreOperation {
    /// Returns the operation name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreOperation::Create => "create",
            StoreOperation::Update => "update",
            StoreOperation::Delete => "delete",
            StoreOperation::Get => "get",
            StoreOperation::List => "list",
        }
    }

    /// Returns true for operations that change stored state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            StoreOperation::Create | StoreOperation::Update | StoreOperation::Delete
        )
    }
}

impl std::fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Core trait for record store implementations.
///
/// Every call is atomic on its own: a failed create, update or delete leaves
/// no partial state behind. Uniqueness and references are enforced by the
/// store, so two concurrent writers racing for the same unique key are
/// settled here and the loser sees [`StoreError::DuplicateKey`].
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Creates a record.
    ///
    /// Fails with `DuplicateKey` if the id or any unique key is taken and with
    /// `MissingReference` if a referenced record does not exist.
    async fn create(&self, record: NewRecord) -> Result<Record>;

    /// Replaces the body, unique keys and references of a record.
    ///
    /// Fails with `NotFound` if the record does not exist and with
    /// `ConcurrencyConflict` if `expected_version` is set and stale.
    async fn update(
        &self,
        entity_type: &str,
        id: RecordId,
        update: RecordUpdate,
    ) -> Result<Record>;

    /// Deletes a record, releasing its unique keys and references.
    ///
    /// Fails with `NotFound` if the record does not exist and with
    /// `Referenced` while other records point at it.
    async fn delete(&self, entity_type: &str, id: RecordId) -> Result<()>;

    /// Retrieves a record by id.
    async fn get(&self, entity_type: &str, id: RecordId) -> Result<Option<Record>>;

    /// Lists records matching a query, in insertion order.
    async fn list(&self, query: RecordQuery) -> Result<Vec<Record>>;
}

/// Extension trait providing convenience methods for record stores.
#[async_trait]
pub trait RecordStoreExt: RecordStore {
    /// Checks if a record exists.
    async fn exists(&self, entity_type: &str, id: RecordId) -> Result<bool> {
        Ok(self.get(entity_type, id).await?.is_some())
    }

    /// Retrieves a record, failing with `NotFound` if it does not exist.
    async fn get_required(&self, entity_type: &str, id: RecordId) -> Result<Record> {
        self.get(entity_type, id)
            .await?
            .ok_or_else(|| StoreError::not_found(entity_type, id))
    }
}

// Blanket implementation for all RecordStore implementations
impl<T: RecordStore + ?Sized> RecordStoreExt for T {}

/// Validates the shape of a record body before it is written.
pub fn validate_fields(entity_type: &str, fields: &serde_json::Value) -> Result<()> {
    if entity_type.trim().is_empty() {
        return Err(StoreError::Validation(
            "entity_type must not be empty".to_string(),
        ));
    }
    if !fields.is_object() {
        return Err(StoreError::Validation(format!(
            "{entity_type} fields must be a JSON object"
        )));
    }
    Ok(())
}
