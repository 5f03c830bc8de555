use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    NewRecord, Record, RecordId, RecordQuery, RecordUpdate, Result, StoreError, UniqueKey, Version,
    store::{RecordStore, StoreOperation, validate_fields},
};

/// A call observed by the in-memory store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    pub operation: StoreOperation,
    pub entity_type: String,
    pub id: Option<RecordId>,
}

type RecordKey = (String, RecordId);
type IndexKey = (String, UniqueKey);

#[derive(Debug, Default)]
struct InMemoryState {
    /// Records with their insertion sequence number.
    records: HashMap<RecordKey, (u64, Record)>,
    unique_index: HashMap<IndexKey, RecordId>,
    next_seq: u64,
    unavailable: bool,
    injected_failures: Vec<(StoreOperation, String)>,
    operation_log: Vec<StoreCall>,
}

impl InMemoryState {
    /// Logs the call and returns an error if a failure was injected for it.
    fn enter(&mut self, operation: StoreOperation, entity_type: &str, id: Option<RecordId>) -> Result<()> {
        self.operation_log.push(StoreCall {
            operation,
            entity_type: entity_type.to_string(),
            id,
        });

        if self.unavailable {
            return Err(StoreError::Unavailable("store is offline".to_string()));
        }

        if let Some(pos) = self
            .injected_failures
            .iter()
            .position(|(op, ty)| *op == operation && ty == entity_type)
        {
            self.injected_failures.remove(pos);
            tracing::debug!(%operation, entity_type, "injected store failure");
            return Err(StoreError::Unavailable(format!(
                "injected {operation} failure for {entity_type}"
            )));
        }

        Ok(())
    }

    fn check_unique_keys(
        &self,
        entity_type: &str,
        keys: &[UniqueKey],
        owner: RecordId,
    ) -> Result<()> {
        for key in keys {
            if let Some(holder) = self.unique_index.get(&(entity_type.to_string(), key.clone()))
                && *holder != owner
            {
                return Err(StoreError::DuplicateKey {
                    entity_type: entity_type.to_string(),
                    key: key.name.clone(),
                    value: key.value.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_references(&self, record: &Record) -> Result<()> {
        for target in &record.references {
            if !self
                .records
                .contains_key(&(target.entity_type.clone(), target.id))
            {
                return Err(StoreError::MissingReference {
                    entity_type: target.entity_type.clone(),
                    id: target.id,
                });
            }
        }
        Ok(())
    }

    fn index_keys(&mut self, record: &Record) {
        for key in &record.unique_keys {
            self.unique_index
                .insert((record.entity_type.clone(), key.clone()), record.id);
        }
    }

    fn unindex_keys(&mut self, record: &Record) {
        for key in &record.unique_keys {
            self.unique_index
                .remove(&(record.entity_type.clone(), key.clone()));
        }
    }
}

/// In-memory record store implementation for testing.
///
/// Provides the same interface and constraint checks as the PostgreSQL
/// implementation, plus hooks to simulate outages and to inspect which calls
/// a workflow made.
#[derive(Clone, Default)]
pub struct InMemoryRecordStore {
    state: Arc<RwLock<InMemoryState>>,
}

impl InMemoryRecordStore {
    /// Creates a new empty in-memory record store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with `Unavailable` until reset.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.write().await.unavailable = unavailable;
    }

    /// Makes the next `operation` on `entity_type` fail with `Unavailable`.
    pub async fn fail_on(&self, operation: StoreOperation, entity_type: impl Into<String>) {
        self.state
            .write()
            .await
            .injected_failures
            .push((operation, entity_type.into()));
    }

    /// Returns every call made so far, in order.
    pub async fn operation_log(&self) -> Vec<StoreCall> {
        self.state.read().await.operation_log.clone()
    }

    /// Forgets the calls recorded so far.
    pub async fn clear_operation_log(&self) {
        self.state.write().await.operation_log.clear();
    }

    /// Returns the number of stored records of `entity_type`.
    pub async fn record_count(&self, entity_type: &str) -> usize {
        self.state
            .read()
            .await
            .records
            .keys()
            .filter(|(ty, _)| ty == entity_type)
            .count()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn create(&self, new: NewRecord) -> Result<Record> {
        let mut state = self.state.write().await;
        state.enter(StoreOperation::Create, &new.entity_type, new.id)?;
        validate_fields(&new.entity_type, &new.fields)?;

        let id = new.id.unwrap_or_default();
        if state.records.contains_key(&(new.entity_type.clone(), id)) {
            return Err(StoreError::DuplicateKey {
                entity_type: new.entity_type,
                key: "id".to_string(),
                value: id.to_string(),
            });
        }

        let now = Utc::now();
        let record = Record {
            id,
            entity_type: new.entity_type,
            version: Version::first(),
            fields: new.fields,
            unique_keys: new.unique_keys,
            references: new.references,
            created_at: now,
            updated_at: now,
        };

        state.check_unique_keys(&record.entity_type, &record.unique_keys, id)?;
        state.check_references(&record)?;

        state.index_keys(&record);
        let seq = state.next_seq;
        state.next_seq += 1;
        state
            .records
            .insert((record.entity_type.clone(), id), (seq, record.clone()));

        Ok(record)
    }

    async fn update(
        &self,
        entity_type: &str,
        id: RecordId,
        update: RecordUpdate,
    ) -> Result<Record> {
        let mut state = self.state.write().await;
        state.enter(StoreOperation::Update, entity_type, Some(id))?;

        let key = (entity_type.to_string(), id);
        let (seq, current) = state
            .records
            .get(&key)
            .cloned()
            .ok_or_else(|| StoreError::not_found(entity_type, id))?;

        if let Some(expected) = update.expected_version
            && expected != current.version
        {
            return Err(StoreError::ConcurrencyConflict {
                entity_type: entity_type.to_string(),
                id,
                expected,
                actual: current.version,
            });
        }

        validate_fields(entity_type, &update.fields)?;

        let updated = Record {
            version: current.version.next(),
            fields: update.fields,
            unique_keys: update.unique_keys,
            references: update.references,
            updated_at: Utc::now(),
            ..current.clone()
        };

        state.check_unique_keys(entity_type, &updated.unique_keys, id)?;
        state.check_references(&updated)?;

        state.unindex_keys(&current);
        state.index_keys(&updated);
        state.records.insert(key, (seq, updated.clone()));

        Ok(updated)
    }

    async fn delete(&self, entity_type: &str, id: RecordId) -> Result<()> {
        let mut state = self.state.write().await;
        state.enter(StoreOperation::Delete, entity_type, Some(id))?;

        let key = (entity_type.to_string(), id);
        let current = state
            .records
            .get(&key)
            .map(|(_, record)| record.clone())
            .ok_or_else(|| StoreError::not_found(entity_type, id))?;

        if let Some((_, holder)) = state.records.values().find(|(_, other)| {
            other
                .references
                .iter()
                .any(|r| r.entity_type == entity_type && r.id == id)
        }) {
            return Err(StoreError::Referenced {
                entity_type: entity_type.to_string(),
                id,
                by_type: holder.entity_type.clone(),
            });
        }

        state.unindex_keys(&current);
        state.records.remove(&key);
        Ok(())
    }

    async fn get(&self, entity_type: &str, id: RecordId) -> Result<Option<Record>> {
        let mut state = self.state.write().await;
        state.enter(StoreOperation::Get, entity_type, Some(id))?;

        Ok(state
            .records
            .get(&(entity_type.to_string(), id))
            .map(|(_, record)| record.clone()))
    }

    async fn list(&self, query: RecordQuery) -> Result<Vec<Record>> {
        let mut state = self.state.write().await;
        state.enter(StoreOperation::List, &query.entity_type, None)?;

        let mut matching: Vec<_> = state
            .records
            .values()
            .filter(|(_, record)| query.matches(record))
            .cloned()
            .collect();
        matching.sort_by_key(|(seq, _)| *seq);

        let records = matching
            .into_iter()
            .map(|(_, record)| record)
            .skip(query.offset.unwrap_or(0));

        Ok(match query.limit {
            Some(limit) => records.take(limit).collect(),
            None => records.collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RecordStoreExt;

    fn vendor(email: &str) -> NewRecord {
        NewRecord::builder()
            .entity_type("vendor")
            .fields_raw(serde_json::json!({"email": email, "actor_type": "farmer"}))
            .unique_key("email", email)
            .build()
            .unwrap()
    }

    fn listing(vendor_id: RecordId, status: &str) -> NewRecord {
        NewRecord::builder()
            .entity_type("listing")
            .fields_raw(serde_json::json!({"status": status}))
            .reference("vendor", vendor_id)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn create_and_get() {
        let store = InMemoryRecordStore::new();
        let created = store.create(vendor("a@farm.test")).await.unwrap();

        assert_eq!(created.version, Version::first());
        assert_eq!(created.entity_type, "vendor");

        let fetched = store.get("vendor", created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(store.record_count("vendor").await, 1);
    }

    #[tokio::test]
    async fn create_with_preset_id() {
        let store = InMemoryRecordStore::new();
        let id = RecordId::new();
        let mut record = vendor("a@farm.test");
        record.id = Some(id);

        let created = store.create(record).await.unwrap();
        assert_eq!(created.id, id);
    }

    #[tokio::test]
    async fn duplicate_unique_key_is_rejected() {
        let store = InMemoryRecordStore::new();
        store.create(vendor("a@farm.test")).await.unwrap();

        let result = store.create(vendor("a@farm.test")).await;
        match result {
            Err(StoreError::DuplicateKey { key, value, .. }) => {
                assert_eq!(key, "email");
                assert_eq!(value, "a@farm.test");
            }
            other => panic!("expected duplicate key, got {other:?}"),
        }
        assert_eq!(store.record_count("vendor").await, 1);
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected() {
        let store = InMemoryRecordStore::new();
        let created = store.create(vendor("a@farm.test")).await.unwrap();
        let mut again = vendor("b@farm.test");
        again.id = Some(created.id);

        let result = store.create(again).await;
        assert!(matches!(result, Err(StoreError::DuplicateKey { key, .. }) if key == "id"));
    }

    #[tokio::test]
    async fn unique_keys_are_scoped_by_entity_type() {
        let store = InMemoryRecordStore::new();
        store.create(vendor("a@farm.test")).await.unwrap();

        let admin = NewRecord::builder()
            .entity_type("admin_user")
            .fields_raw(serde_json::json!({}))
            .unique_key("email", "a@farm.test")
            .build()
            .unwrap();
        assert!(store.create(admin).await.is_ok());
    }

    #[tokio::test]
    async fn non_object_fields_are_rejected() {
        let store = InMemoryRecordStore::new();
        let record = NewRecord::builder()
            .entity_type("vendor")
            .fields_raw(serde_json::json!("nope"))
            .build()
            .unwrap();
        assert!(matches!(
            store.create(record).await,
            Err(StoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn missing_reference_is_rejected() {
        let store = InMemoryRecordStore::new();
        let result = store.create(listing(RecordId::new(), "active")).await;
        assert!(matches!(result, Err(StoreError::MissingReference { .. })));
        assert_eq!(store.record_count("listing").await, 0);
    }

    #[tokio::test]
    async fn referenced_record_cannot_be_deleted() {
        let store = InMemoryRecordStore::new();
        let v = store.create(vendor("a@farm.test")).await.unwrap();
        let l = store.create(listing(v.id, "active")).await.unwrap();

        let result = store.delete("vendor", v.id).await;
        assert!(
            matches!(result, Err(StoreError::Referenced { ref by_type, .. }) if by_type == "listing")
        );

        store.delete("listing", l.id).await.unwrap();
        store.delete("vendor", v.id).await.unwrap();
        assert_eq!(store.record_count("vendor").await, 0);
    }

    #[tokio::test]
    async fn update_bumps_version_and_reindexes_keys() {
        let store = InMemoryRecordStore::new();
        let created = store.create(vendor("a@farm.test")).await.unwrap();

        let updated = store
            .update(
                "vendor",
                created.id,
                RecordUpdate::new(serde_json::json!({"email": "b@farm.test"}))
                    .unique_keys(vec![UniqueKey::new("email", "b@farm.test")]),
            )
            .await
            .unwrap();
        assert_eq!(updated.version, Version::new(2));
        assert_eq!(updated.created_at, created.created_at);

        // The old key is released, the new one is held.
        assert!(store.create(vendor("a@farm.test")).await.is_ok());
        assert!(matches!(
            store.create(vendor("b@farm.test")).await,
            Err(StoreError::DuplicateKey { .. })
        ));
    }

    #[tokio::test]
    async fn update_may_keep_its_own_keys() {
        let store = InMemoryRecordStore::new();
        let created = store.create(vendor("a@farm.test")).await.unwrap();

        let result = store
            .update(
                "vendor",
                created.id,
                RecordUpdate::new(created.fields.clone()).unique_keys(created.unique_keys.clone()),
            )
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn update_missing_record_is_not_found() {
        let store = InMemoryRecordStore::new();
        let result = store
            .update("vendor", RecordId::new(), RecordUpdate::new(serde_json::json!({})))
            .await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn stale_version_is_a_conflict() {
        let store = InMemoryRecordStore::new();
        let created = store.create(vendor("a@farm.test")).await.unwrap();
        store
            .update(
                "vendor",
                created.id,
                RecordUpdate::new(created.fields.clone()).unique_keys(created.unique_keys.clone()),
            )
            .await
            .unwrap();

        let result = store
            .update(
                "vendor",
                created.id,
                RecordUpdate::new(created.fields.clone()).expect_version(Version::first()),
            )
            .await;
        assert!(matches!(result, Err(StoreError::ConcurrencyConflict { .. })));
    }

    #[tokio::test]
    async fn delete_missing_record_is_not_found() {
        let store = InMemoryRecordStore::new();
        let result = store.delete("vendor", RecordId::new()).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn list_filters_in_insertion_order() {
        let store = InMemoryRecordStore::new();
        let v = store.create(vendor("a@farm.test")).await.unwrap();
        let first = store.create(listing(v.id, "active")).await.unwrap();
        store.create(listing(v.id, "sold")).await.unwrap();
        let third = store.create(listing(v.id, "active")).await.unwrap();

        let active = store
            .list(RecordQuery::for_entity("listing").field_eq("status", "active"))
            .await
            .unwrap();
        let ids: Vec<_> = active.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![first.id, third.id]);

        let page = store
            .list(RecordQuery::for_entity("listing").offset(1).limit(1))
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].field("status"), Some(&serde_json::json!("sold")));
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = InMemoryRecordStore::new();
        store.set_unavailable(true).await;

        assert!(matches!(
            store.create(vendor("a@farm.test")).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(matches!(
            store.get("vendor", RecordId::new()).await,
            Err(StoreError::Unavailable(_))
        ));

        store.set_unavailable(false).await;
        assert!(store.create(vendor("a@farm.test")).await.is_ok());
    }

    #[tokio::test]
    async fn injected_failure_fires_once() {
        let store = InMemoryRecordStore::new();
        store.fail_on(StoreOperation::Create, "vendor").await;

        assert!(matches!(
            store.create(vendor("a@farm.test")).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.create(vendor("a@farm.test")).await.is_ok());
    }

    #[tokio::test]
    async fn operation_log_records_calls() {
        let store = InMemoryRecordStore::new();
        let created = store.create(vendor("a@farm.test")).await.unwrap();
        store.exists("vendor", created.id).await.unwrap();

        let log = store.operation_log().await;
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].operation, StoreOperation::Create);
        assert_eq!(log[1].operation, StoreOperation::Get);
        assert_eq!(log[1].id, Some(created.id));

        store.clear_operation_log().await;
        assert!(store.operation_log().await.is_empty());
    }

    #[tokio::test]
    async fn get_required_reports_not_found() {
        let store = InMemoryRecordStore::new();
        let result = store.get_required("vendor", RecordId::new()).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }
}
