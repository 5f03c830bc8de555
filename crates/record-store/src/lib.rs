//! Durable keyed storage for marketplace records.
//!
//! Records are JSON objects addressed by `(entity_type, id)`. The store
//! enforces unique keys and references itself, so callers never have to
//! coordinate uniqueness across concurrent writers.

pub mod entity;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod record;
pub mod store;

pub use common::RecordId;
pub use entity::{Entity, EntityStoreExt};
pub use error::{Result, StoreError};
pub use memory::{InMemoryRecordStore, StoreCall};
pub use postgres::PostgresRecordStore;
pub use query::RecordQuery;
pub use record::{NewRecord, NewRecordBuilder, Record, RecordRef, RecordUpdate, UniqueKey, Version};
pub use store::{RecordStore, RecordStoreExt, StoreOperation};
