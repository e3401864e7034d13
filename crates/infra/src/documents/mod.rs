//! Document store for the content collections.

pub mod postgres;

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use portal_core::{ContentCollection, Document, DocumentId, Fields};

use crate::store::StoreError;

/// Document database: named collections of id → fields.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list(&self, collection: ContentCollection) -> Result<Vec<Document>, StoreError>;

    async fn get(&self, collection: ContentCollection, id: &DocumentId) -> Result<Option<Document>, StoreError>;

    /// Create or replace a document.
    async fn put(&self, collection: ContentCollection, id: &DocumentId, data: Fields) -> Result<(), StoreError>;

    /// Merge fields into an existing document. `false` when it does not exist.
    async fn merge(&self, collection: ContentCollection, id: &DocumentId, data: Fields) -> Result<bool, StoreError>;

    /// `false` when the document did not exist.
    async fn remove(&self, collection: ContentCollection, id: &DocumentId) -> Result<bool, StoreError>;
}

#[async_trait]
impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    async fn list(&self, collection: ContentCollection) -> Result<Vec<Document>, StoreError> {
        (**self).list(collection).await
    }

    async fn get(&self, collection: ContentCollection, id: &DocumentId) -> Result<Option<Document>, StoreError> {
        (**self).get(collection, id).await
    }

    async fn put(&self, collection: ContentCollection, id: &DocumentId, data: Fields) -> Result<(), StoreError> {
        (**self).put(collection, id, data).await
    }

    async fn merge(&self, collection: ContentCollection, id: &DocumentId, data: Fields) -> Result<bool, StoreError> {
        (**self).merge(collection, id, data).await
    }

    async fn remove(&self, collection: ContentCollection, id: &DocumentId) -> Result<bool, StoreError> {
        (**self).remove(collection, id).await
    }
}

/// In-memory document store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    inner: RwLock<BTreeMap<(ContentCollection, DocumentId), Fields>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("in-memory document store lock poisoned".to_string())
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn list(&self, collection: ContentCollection) -> Result<Vec<Document>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map
            .iter()
            .filter(|((c, _), _)| *c == collection)
            .map(|((_, id), data)| Document {
                id: id.clone(),
                data: data.clone(),
            })
            .collect())
    }

    async fn get(&self, collection: ContentCollection, id: &DocumentId) -> Result<Option<Document>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(&(collection, id.clone())).map(|data| Document {
            id: id.clone(),
            data: data.clone(),
        }))
    }

    async fn put(&self, collection: ContentCollection, id: &DocumentId, data: Fields) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.insert((collection, id.clone()), data);
        Ok(())
    }

    async fn merge(&self, collection: ContentCollection, id: &DocumentId, data: Fields) -> Result<bool, StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        match map.get_mut(&(collection, id.clone())) {
            Some(existing) => {
                existing.extend(data);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove(&self, collection: ContentCollection, id: &DocumentId) -> Result<bool, StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        Ok(map.remove(&(collection, id.clone())).is_some())
    }
}
