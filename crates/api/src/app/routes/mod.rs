use std::sync::Arc;

use axum::{routing::get, Router};

use crate::app::services::AppServices;

pub mod content;
pub mod members;
pub mod notifications;
pub mod portal;
pub mod system;

/// Router for all authenticated endpoints (mounted under `/api`).
pub fn router(services: &Arc<AppServices>) -> Router {
    let users = Router::new()
        .merge(members::router(services))
        .merge(notifications::router(services))
        .nest("/portal", portal::router(services));

    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/users", users)
        .nest("/firestore", content::router(services))
}
