//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container and need a Docker daemon.
//! Run with:
//!
//! ```bash
//! cargo test -p record-store --test postgres_integration -- --ignored --test-threads=1
//! ```

use std::sync::Arc;

use record_store::{
    NewRecord, PostgresRecordStore, RecordId, RecordQuery, RecordStore, RecordStoreExt,
    RecordUpdate, StoreError, UniqueKey, Version,
};
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let pool = PgPool::connect(&connection_string).await.unwrap();
            PostgresRecordStore::new(pool.clone())
                .run_migrations()
                .await
                .unwrap();
            pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresRecordStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE record_references, record_unique_keys, records")
        .execute(&pool)
        .await
        .unwrap();

    PostgresRecordStore::new(pool)
}

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
        .fields_raw(serde_json::json!({"status": status, "title": "Maize"}))
        .reference("vendor", vendor_id)
        .build()
        .unwrap()
}

#[tokio::test]
#[ignore = "requires docker"]
async fn create_and_get_record() {
    let store = get_test_store().await;

    let created = store.create(vendor("a@farm.test")).await.unwrap();
    assert_eq!(created.version, Version::first());

    let fetched = store.get("vendor", created.id).await.unwrap().unwrap();
    assert_eq!(fetched, created);
    assert_eq!(fetched.unique_keys, vec![UniqueKey::new("email", "a@farm.test")]);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn duplicate_unique_key_is_rejected() {
    let store = get_test_store().await;
    store.create(vendor("a@farm.test")).await.unwrap();

    let result = store.create(vendor("a@farm.test")).await;
    assert!(matches!(
        result,
        Err(StoreError::DuplicateKey { ref key, .. }) if key == "email"
    ));

    let all = store.list(RecordQuery::for_entity("vendor")).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn duplicate_id_is_rejected() {
    let store = get_test_store().await;
    let created = store.create(vendor("a@farm.test")).await.unwrap();

    let mut again = vendor("b@farm.test");
    again.id = Some(created.id);
    let result = store.create(again).await;
    assert!(matches!(
        result,
        Err(StoreError::DuplicateKey { ref key, .. }) if key == "id"
    ));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn concurrent_creates_with_same_key_settle_in_the_database() {
    let store = get_test_store().await;

    let (a, b) = tokio::join!(
        store.create(vendor("race@farm.test")),
        store.create(vendor("race@farm.test"))
    );

    assert!(a.is_ok() ^ b.is_ok());
    let loser = if a.is_err() { a } else { b };
    assert!(matches!(loser, Err(StoreError::DuplicateKey { .. })));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn references_are_enforced() {
    let store = get_test_store().await;

    let result = store.create(listing(RecordId::new(), "active")).await;
    assert!(matches!(result, Err(StoreError::MissingReference { .. })));

    let v = store.create(vendor("a@farm.test")).await.unwrap();
    let l = store.create(listing(v.id, "active")).await.unwrap();
    assert_eq!(l.references[0].id, v.id);

    let result = store.delete("vendor", v.id).await;
    assert!(matches!(result, Err(StoreError::Referenced { .. })));

    store.delete("listing", l.id).await.unwrap();
    store.delete("vendor", v.id).await.unwrap();
    assert!(!store.exists("vendor", v.id).await.unwrap());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn update_replaces_keys_and_checks_version() {
    let store = get_test_store().await;
    let created = store.create(vendor("a@farm.test")).await.unwrap();

    let updated = store
        .update(
            "vendor",
            created.id,
            RecordUpdate::new(serde_json::json!({"email": "b@farm.test"}))
                .unique_keys(vec![UniqueKey::new("email", "b@farm.test")])
                .expect_version(Version::first()),
        )
        .await
        .unwrap();
    assert_eq!(updated.version, Version::new(2));
    assert_eq!(updated.created_at, created.created_at);

    assert!(store.create(vendor("a@farm.test")).await.is_ok());

    let stale = store
        .update(
            "vendor",
            created.id,
            RecordUpdate::new(serde_json::json!({})).expect_version(Version::first()),
        )
        .await;
    assert!(matches!(stale, Err(StoreError::ConcurrencyConflict { .. })));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn missing_records_are_not_found() {
    let store = get_test_store().await;
    let id = RecordId::new();

    assert!(store.get("vendor", id).await.unwrap().is_none());
    assert!(matches!(
        store.delete("vendor", id).await,
        Err(StoreError::NotFound { .. })
    ));
    assert!(matches!(
        store
            .update("vendor", id, RecordUpdate::new(serde_json::json!({})))
            .await,
        Err(StoreError::NotFound { .. })
    ));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn list_filters_and_pages_in_insertion_order() {
    let store = get_test_store().await;
    let v = store.create(vendor("a@farm.test")).await.unwrap();

    let mut ids = Vec::new();
    for status in ["active", "sold", "active", "active"] {
        ids.push(store.create(listing(v.id, status)).await.unwrap().id);
    }

    let active = store
        .list(RecordQuery::for_entity("listing").field_eq("status", "active"))
        .await
        .unwrap();
    let active_ids: Vec<_> = active.iter().map(|r| r.id).collect();
    assert_eq!(active_ids, vec![ids[0], ids[2], ids[3]]);

    let page = store
        .list(
            RecordQuery::for_entity("listing")
                .field_eq("status", "active")
                .offset(1)
                .limit(1),
        )
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, ids[2]);

    let picked = store
        .list(RecordQuery::for_entity("listing").ids(vec![ids[1]]))
        .await
        .unwrap();
    assert_eq!(picked.len(), 1);
    assert_eq!(picked[0].field("status"), Some(&serde_json::json!("sold")));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn deleted_record_can_be_restored_with_its_id() {
    let store = get_test_store().await;
    let created = store.create(vendor("a@farm.test")).await.unwrap();
    store.delete("vendor", created.id).await.unwrap();

    let mut restore = vendor("a@farm.test");
    restore.id = Some(created.id);
    let restored = store.create(restore).await.unwrap();

    assert_eq!(restored.id, created.id);
    assert_eq!(restored.fields, created.fields);
    assert_eq!(restored.unique_keys, created.unique_keys);
}
