//! Content collection editors (`/firestore/:collection`).

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};

use portal_auth::{Action, Module};
use portal_core::{ContentCollection, DocumentId, Fields};

use crate::app::{errors, services::AppServices};
use crate::authz::{Requirement, guarded};

pub fn router(services: &Arc<AppServices>) -> Router {
    let view = Router::new()
        .route("/:collection", get(list_documents))
        .route("/:collection/:doc_id", get(get_document));
    let edit = Router::new()
        .route("/:collection", post(add_document))
        .route("/:collection/:doc_id", put(update_document));
    let remove = Router::new().route("/:collection/:doc_id", delete(delete_document));

    Router::new()
        .merge(guarded(view, services, Requirement::Permission(Module::Content, Action::View)))
        .merge(guarded(edit, services, Requirement::Permission(Module::Content, Action::Edit)))
        .merge(guarded(remove, services, Requirement::Permission(Module::Content, Action::Delete)))
}

fn parse_collection(raw: &str) -> Result<ContentCollection, axum::response::Response> {
    raw.parse::<ContentCollection>()
        .map_err(errors::domain_error_to_response)
}

fn parse_document(
    collection: &str,
    doc_id: String,
) -> Result<(ContentCollection, DocumentId), axum::response::Response> {
    let collection = parse_collection(collection)?;
    let id = DocumentId::parse(doc_id).map_err(errors::domain_error_to_response)?;
    Ok((collection, id))
}

pub async fn list_documents(
    Extension(services): Extension<Arc<AppServices>>,
    Path(collection): Path<String>,
) -> axum::response::Response {
    let collection = match parse_collection(&collection) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match services.content.list(collection).await {
        Ok(docs) => (StatusCode::OK, Json(docs)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_document(
    Extension(services): Extension<Arc<AppServices>>,
    Path((collection, doc_id)): Path<(String, String)>,
) -> axum::response::Response {
    let (collection, id) = match parse_document(&collection, doc_id) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    match services.content.get(collection, &id).await {
        Ok(doc) => (StatusCode::OK, Json(doc)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn add_document(
    Extension(services): Extension<Arc<AppServices>>,
    Path(collection): Path<String>,
    Json(body): Json<Fields>,
) -> axum::response::Response {
    let collection = match parse_collection(&collection) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match services.content.add(collection, body).await {
        Ok(doc) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "id": doc.id,
                "message": "Document added successfully",
            })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_document(
    Extension(services): Extension<Arc<AppServices>>,
    Path((collection, doc_id)): Path<(String, String)>,
    Json(body): Json<Fields>,
) -> axum::response::Response {
    let (collection, id) = match parse_document(&collection, doc_id) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    match services.content.update(collection, &id, body).await {
        Ok(doc) => (StatusCode::OK, Json(doc)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_document(
    Extension(services): Extension<Arc<AppServices>>,
    Path((collection, doc_id)): Path<(String, String)>,
) -> axum::response::Response {
    let (collection, id) = match parse_document(&collection, doc_id) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    match services.content.delete(collection, &id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "message": "Document deleted successfully" })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
