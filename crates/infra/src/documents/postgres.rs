//! Postgres-backed document store (the `documents` table).

use async_trait::async_trait;
use serde_json::Value;
use sqlx::Row;

use portal_core::{ContentCollection, Document, DocumentId, Fields};

use super::DocumentStore;
use crate::store::{PostgresRecordStore, StoreError};

fn decode(collection: ContentCollection, doc_id: String, data: Value) -> Result<Document, StoreError> {
    let path = format!("{}/{}", collection.storage_path(), doc_id);
    let id = DocumentId::parse(doc_id).map_err(|e| StoreError::malformed(&path, e))?;
    match data {
        Value::Object(data) => Ok(Document { id, data }),
        _ => Err(StoreError::malformed(path, "document body is not an object")),
    }
}

#[async_trait]
impl DocumentStore for PostgresRecordStore {
    #[tracing::instrument(skip(self))]
    async fn list(&self, collection: ContentCollection) -> Result<Vec<Document>, StoreError> {
        let rows = sqlx::query(
            "SELECT doc_id, data FROM documents WHERE collection = $1 ORDER BY created_at, doc_id",
        )
        .bind(collection.storage_path())
        .fetch_all(self.pool())
        .await?;

        rows.into_iter()
            .map(|r| {
                let doc_id: String = r.try_get("doc_id")?;
                let data: Value = r.try_get("data")?;
                decode(collection, doc_id, data)
            })
            .collect()
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, collection: ContentCollection, id: &DocumentId) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query("SELECT data FROM documents WHERE collection = $1 AND doc_id = $2")
            .bind(collection.storage_path())
            .bind(id.as_str())
            .fetch_optional(self.pool())
            .await?;

        match row {
            Some(r) => {
                let data: Value = r.try_get("data")?;
                decode(collection, id.to_string(), data).map(Some)
            }
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self, data))]
    async fn put(&self, collection: ContentCollection, id: &DocumentId, data: Fields) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO documents (collection, doc_id, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, doc_id)
            DO UPDATE SET
                data = EXCLUDED.data,
                updated_at = NOW()
            "#,
        )
        .bind(collection.storage_path())
        .bind(id.as_str())
        .bind(Value::Object(data))
        .execute(self.pool())
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, data))]
    async fn merge(&self, collection: ContentCollection, id: &DocumentId, data: Fields) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET data = data || $3, updated_at = NOW()
            WHERE collection = $1 AND doc_id = $2
            "#,
        )
        .bind(collection.storage_path())
        .bind(id.as_str())
        .bind(Value::Object(data))
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self))]
    async fn remove(&self, collection: ContentCollection, id: &DocumentId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND doc_id = $2")
            .bind(collection.storage_path())
            .bind(id.as_str())
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
