//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store/dispatcher wiring and the services built on them
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use portal_auth::{Hs256TokenVerifier, TokenVerifier};
use portal_infra::PortalConfig;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router from configuration (used by `main.rs`).
pub async fn build_app(config: &PortalConfig) -> anyhow::Result<Router> {
    let verifier = Arc::new(Hs256TokenVerifier::new(config.jwt_secret.as_bytes()));
    let services = Arc::new(services::build_services(config).await?);
    Ok(router(services, verifier))
}

/// Assemble the router over already-built services.
pub fn router(services: Arc<AppServices>, verifier: Arc<dyn TokenVerifier>) -> Router {
    let auth_state = middleware::AuthState { verifier };

    // Protected routes: bearer auth first, then per-route permission guards.
    let protected = routes::router(&services).layer(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn_with_state(auth_state, middleware::auth_middleware))
            .layer(Extension(services)),
    );

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api", protected)
}
