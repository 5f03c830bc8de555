use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    NewRecord, Record, RecordId, RecordQuery, RecordRef, RecordUpdate, Result, StoreError,
    UniqueKey, Version,
    store::{RecordStore, StoreOperation, validate_fields},
};

const SELECT_RECORD: &str = r#"
    SELECT r.id, r.entity_type, r.version, r.fields, r.created_at, r.updated_at,
        COALESCE((
            SELECT jsonb_agg(jsonb_build_object('name', k.key_name, 'value', k.key_value) ORDER BY k.ordinal)
            FROM record_unique_keys k
            WHERE k.entity_type = r.entity_type AND k.record_id = r.id
        ), '[]'::jsonb) AS unique_keys,
        COALESCE((
            SELECT jsonb_agg(jsonb_build_object('entity_type', f.target_type, 'id', f.target_id) ORDER BY f.ordinal)
            FROM record_references f
            WHERE f.owner_type = r.entity_type AND f.owner_id = r.id
        ), '[]'::jsonb) AS refs
    FROM records r
"#;

/// PostgreSQL-backed record store implementation.
///
/// Unique keys and references live in their own tables so the database
/// constraints settle races between concurrent writers.
#[derive(Clone)]
pub struct PostgresRecordStore {
    pool: PgPool,
}

impl PostgresRecordStore {
    /// Creates a new PostgreSQL record store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("record store migrations applied");
        Ok(())
    }

    fn row_to_record(row: PgRow) -> Result<Record> {
        let unique_keys: Vec<UniqueKey> = serde_json::from_value(row.try_get("unique_keys")?)?;
        let references: Vec<RecordRef> = serde_json::from_value(row.try_get("refs")?)?;

        Ok(Record {
            id: RecordId::from_uuid(row.try_get::<Uuid, _>("id")?),
            entity_type: row.try_get("entity_type")?,
            version: Version::new(row.try_get("version")?),
            fields: row.try_get("fields")?,
            unique_keys,
            references,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn record_operation(operation: StoreOperation) {
        metrics::counter!("record_store_operations_total", "operation" => operation.as_str())
            .increment(1);
    }

    /// Timestamps are stored with microsecond precision.
    fn now() -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }

    async fn fetch_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        entity_type: &str,
        id: RecordId,
    ) -> Result<Option<Record>> {
        let sql = format!("{SELECT_RECORD} WHERE r.entity_type = $1 AND r.id = $2");
        let row = sqlx::query(&sql)
            .bind(entity_type)
            .bind(id.as_uuid())
            .fetch_optional(&mut **tx)
            .await?;

        row.map(Self::row_to_record).transpose()
    }

    async fn insert_unique_keys(
        tx: &mut Transaction<'_, Postgres>,
        entity_type: &str,
        id: RecordId,
        keys: &[UniqueKey],
    ) -> Result<()> {
        for (ordinal, key) in keys.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO record_unique_keys (entity_type, key_name, key_value, record_id, ordinal)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(entity_type)
            .bind(&key.name)
            .bind(&key.value)
            .bind(id.as_uuid())
            .bind(ordinal as i32)
            .execute(&mut **tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("record_unique_keys_pkey")
                {
                    tracing::debug!(entity_type, key = %key.name, "unique key already taken");
                    return StoreError::DuplicateKey {
                        entity_type: entity_type.to_string(),
                        key: key.name.clone(),
                        value: key.value.clone(),
                    };
                }
                StoreError::Database(e)
            })?;
        }
        Ok(())
    }

    async fn insert_references(
        tx: &mut Transaction<'_, Postgres>,
        entity_type: &str,
        id: RecordId,
        refs: &[RecordRef],
    ) -> Result<()> {
        for (ordinal, target) in refs.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO record_references (owner_type, owner_id, target_type, target_id, ordinal)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(entity_type)
            .bind(id.as_uuid())
            .bind(&target.entity_type)
            .bind(target.id.as_uuid())
            .bind(ordinal as i32)
            .execute(&mut **tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("record_references_target_fkey")
                {
                    tracing::debug!(
                        entity_type,
                        target_type = %target.entity_type,
                        target_id = %target.id,
                        "referenced record does not exist"
                    );
                    return StoreError::MissingReference {
                        entity_type: target.entity_type.clone(),
                        id: target.id,
                    };
                }
                StoreError::Database(e)
            })?;
        }
        Ok(())
    }

    async fn find_referrer(
        tx: &mut Transaction<'_, Postgres>,
        entity_type: &str,
        id: RecordId,
    ) -> Result<Option<String>> {
        let referrer: Option<String> = sqlx::query_scalar(
            r#"
            SELECT owner_type FROM record_references
            WHERE target_type = $1 AND target_id = $2
            LIMIT 1
            "#,
        )
        .bind(entity_type)
        .bind(id.as_uuid())
        .fetch_optional(&mut **tx)
        .await?;

        Ok(referrer)
    }
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    #[tracing::instrument(skip_all, fields(entity_type = %new.entity_type))]
    async fn create(&self, new: NewRecord) -> Result<Record> {
        Self::record_operation(StoreOperation::Create);
        validate_fields(&new.entity_type, &new.fields)?;

        let id = new.id.unwrap_or_default();
        let now = Self::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO records (entity_type, id, version, fields, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            "#,
        )
        .bind(&new.entity_type)
        .bind(id.as_uuid())
        .bind(Version::first().as_i64())
        .bind(&new.fields)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("records_pkey")
            {
                tracing::debug!(entity_type = %new.entity_type, %id, "record id already taken");
                return StoreError::DuplicateKey {
                    entity_type: new.entity_type.clone(),
                    key: "id".to_string(),
                    value: id.to_string(),
                };
            }
            StoreError::Database(e)
        })?;

        Self::insert_unique_keys(&mut tx, &new.entity_type, id, &new.unique_keys).await?;
        Self::insert_references(&mut tx, &new.entity_type, id, &new.references).await?;

        let record = Self::fetch_in_tx(&mut tx, &new.entity_type, id)
            .await?
            .ok_or_else(|| StoreError::not_found(&new.entity_type, id))?;

        tx.commit().await?;
        Ok(record)
    }

    #[tracing::instrument(skip(self, update))]
    async fn update(
        &self,
        entity_type: &str,
        id: RecordId,
        update: RecordUpdate,
    ) -> Result<Record> {
        Self::record_operation(StoreOperation::Update);

        let mut tx = self.pool.begin().await?;

        // Lock the row so concurrent updates serialize on the version check
        let current: Option<i64> = sqlx::query_scalar(
            "SELECT version FROM records WHERE entity_type = $1 AND id = $2 FOR UPDATE",
        )
        .bind(entity_type)
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?;

        let actual = Version::new(current.ok_or_else(|| StoreError::not_found(entity_type, id))?);

        if let Some(expected) = update.expected_version
            && expected != actual
        {
            tracing::debug!(entity_type, %id, %expected, %actual, "version check failed");
            return Err(StoreError::ConcurrencyConflict {
                entity_type: entity_type.to_string(),
                id,
                expected,
                actual,
            });
        }

        validate_fields(entity_type, &update.fields)?;

        sqlx::query(
            r#"
            UPDATE records SET version = $3, fields = $4, updated_at = $5
            WHERE entity_type = $1 AND id = $2
            "#,
        )
        .bind(entity_type)
        .bind(id.as_uuid())
        .bind(actual.next().as_i64())
        .bind(&update.fields)
        .bind(Self::now())
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM record_unique_keys WHERE entity_type = $1 AND record_id = $2")
            .bind(entity_type)
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM record_references WHERE owner_type = $1 AND owner_id = $2")
            .bind(entity_type)
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await?;

        Self::insert_unique_keys(&mut tx, entity_type, id, &update.unique_keys).await?;
        Self::insert_references(&mut tx, entity_type, id, &update.references).await?;

        let record = Self::fetch_in_tx(&mut tx, entity_type, id)
            .await?
            .ok_or_else(|| StoreError::not_found(entity_type, id))?;

        tx.commit().await?;
        Ok(record)
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, entity_type: &str, id: RecordId) -> Result<()> {
        Self::record_operation(StoreOperation::Delete);

        let mut tx = self.pool.begin().await?;

        if let Some(by_type) = Self::find_referrer(&mut tx, entity_type, id).await? {
            tracing::debug!(entity_type, %id, %by_type, "delete refused, record is referenced");
            return Err(StoreError::Referenced {
                entity_type: entity_type.to_string(),
                id,
                by_type,
            });
        }

        let result = sqlx::query("DELETE FROM records WHERE entity_type = $1 AND id = $2")
            .bind(entity_type)
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                // A reference added after the check above
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("record_references_target_fkey")
                {
                    tracing::debug!(entity_type, %id, "record gained a reference during delete");
                    return StoreError::Referenced {
                        entity_type: entity_type.to_string(),
                        id,
                        by_type: "record".to_string(),
                    };
                }
                StoreError::Database(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(entity_type, id));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, entity_type: &str, id: RecordId) -> Result<Option<Record>> {
        Self::record_operation(StoreOperation::Get);

        let sql = format!("{SELECT_RECORD} WHERE r.entity_type = $1 AND r.id = $2");
        let row = sqlx::query(&sql)
            .bind(entity_type)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_record).transpose()
    }

    async fn list(&self, query: RecordQuery) -> Result<Vec<Record>> {
        Self::record_operation(StoreOperation::List);

        let mut sql = format!("{SELECT_RECORD} WHERE r.entity_type = $1");
        let mut param_count = 1;

        // Build dynamic query
        if !query.field_filters.is_empty() {
            param_count += 1;
            sql.push_str(&format!(" AND r.fields @> ${param_count}"));
        }
        if query.ids.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND r.id = ANY(${param_count})"));
        }

        sql.push_str(" ORDER BY r.seq ASC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let filter = query.filter_object();
        let mut sqlx_query = sqlx::query(&sql).bind(&query.entity_type);

        if !query.field_filters.is_empty() {
            sqlx_query = sqlx_query.bind(filter);
        }
        if let Some(ids) = query.ids {
            let ids: Vec<Uuid> = ids.iter().map(RecordId::as_uuid).collect();
            sqlx_query = sqlx_query.bind(ids);
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(offset as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_record).collect()
    }
}
