//! Postgres-backed record store.
//!
//! Every record is a row of the `records` table keyed by
//! `(collection, key)` with its JSON body in a JSONB column. Single-row
//! statements give the per-key atomicity the portal relies on.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Row, postgres::PgPoolOptions};

use portal_core::Fields;

use super::{Collection, RecordPath, RecordStore, StoreError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    collection TEXT NOT NULL,
    key        TEXT NOT NULL,
    value      JSONB NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (collection, key)
);

CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    doc_id     TEXT NOT NULL,
    data       JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (collection, doc_id)
);
"#;

/// Record (and document) store over a shared connection pool.
#[derive(Debug, Clone)]
pub struct PostgresRecordStore {
    pool: PgPool,
}

impl PostgresRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a pool; store-level timeouts live here.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Create the tables if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    #[tracing::instrument(skip(self), fields(path = %path))]
    async fn get(&self, path: &RecordPath) -> Result<Option<Value>, StoreError> {
        let row = sqlx::query("SELECT value FROM records WHERE collection = $1 AND key = $2")
            .bind(path.collection.as_str())
            .bind(&path.key)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.try_get::<Value, _>("value"))
            .transpose()
            .map_err(StoreError::from)
    }

    #[tracing::instrument(skip(self, value), fields(path = %path))]
    async fn set(&self, path: &RecordPath, value: Value) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO records (collection, key, value)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, key)
            DO UPDATE SET
                value = EXCLUDED.value,
                updated_at = NOW()
            "#,
        )
        .bind(path.collection.as_str())
        .bind(&path.key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, fields), fields(path = %path))]
    async fn update(&self, path: &RecordPath, fields: Fields) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO records (collection, key, value)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, key)
            DO UPDATE SET
                value = CASE
                    WHEN jsonb_typeof(records.value) = 'object' THEN records.value || EXCLUDED.value
                    ELSE EXCLUDED.value
                END,
                updated_at = NOW()
            "#,
        )
        .bind(path.collection.as_str())
        .bind(&path.key)
        .bind(Value::Object(fields))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(path = %path))]
    async fn delete(&self, path: &RecordPath) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM records WHERE collection = $1 AND key = $2")
            .bind(path.collection.as_str())
            .bind(&path.key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn list(&self, collection: Collection) -> Result<BTreeMap<String, Value>, StoreError> {
        let rows = sqlx::query("SELECT key, value FROM records WHERE collection = $1 ORDER BY key")
            .bind(collection.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|r| Ok((r.try_get::<String, _>("key")?, r.try_get::<Value, _>("value")?)))
            .collect()
    }
}
