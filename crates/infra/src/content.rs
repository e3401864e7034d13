//! Content collection editing over a [`DocumentStore`].

use portal_core::{ContentCollection, Document, DocumentId, Fields};

use crate::documents::DocumentStore;
use crate::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone)]
pub struct ContentLibrary<D> {
    documents: D,
}

impl<D> ContentLibrary<D>
where
    D: DocumentStore,
{
    pub fn new(documents: D) -> Self {
        Self { documents }
    }

    pub async fn list(&self, collection: ContentCollection) -> ServiceResult<Vec<Document>> {
        Ok(self.documents.list(collection).await?)
    }

    pub async fn get(&self, collection: ContentCollection, id: &DocumentId) -> ServiceResult<Document> {
        self.documents
            .get(collection, id)
            .await?
            .ok_or_else(|| not_found(collection, id))
    }

    /// Validate and store a new document.
    ///
    /// Coptic lessons carry their own id; everything else gets a fresh one.
    #[tracing::instrument(skip(self, data))]
    pub async fn add(&self, collection: ContentCollection, data: Fields) -> ServiceResult<Document> {
        let id = collection.prepare_new(&data)?.unwrap_or_else(DocumentId::generate);
        self.documents.put(collection, &id, data.clone()).await?;
        tracing::info!(%id, "document added");
        Ok(Document { id, data })
    }

    #[tracing::instrument(skip(self, data))]
    pub async fn update(&self, collection: ContentCollection, id: &DocumentId, data: Fields) -> ServiceResult<Document> {
        if !self.documents.merge(collection, id, data).await? {
            return Err(not_found(collection, id));
        }
        self.get(collection, id).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, collection: ContentCollection, id: &DocumentId) -> ServiceResult<()> {
        if !self.documents.remove(collection, id).await? {
            return Err(not_found(collection, id));
        }
        tracing::info!("document deleted");
        Ok(())
    }
}

fn not_found(collection: ContentCollection, id: &DocumentId) -> ServiceError {
    ServiceError::not_found(format!("document {id} not found in {collection}"))
}
