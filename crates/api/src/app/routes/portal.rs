//! Portal (staff/admin) accounts.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;

use portal_auth::{AccessChange, Action, LoginProfile, Module};
use portal_core::PortalUid;

use crate::app::{dto, errors, services::AppServices};
use crate::authz::{Requirement, guarded};
use crate::context::{ActorContext, PrincipalContext};

/// Mounted under `/users/portal`.
pub fn router(services: &Arc<AppServices>) -> Router {
    let authenticated = Router::new()
        .route("/sync", post(sync))
        .route("/me", get(me));

    let listing = Router::new().route("/users", get(list_users));
    let admin = Router::new().route("/users/:uid", put(update_access));

    Router::new()
        .merge(authenticated)
        .merge(guarded(listing, services, Requirement::Permission(Module::Users, Action::View)))
        .merge(guarded(admin, services, Requirement::Admin))
}

/// POST /users/portal/sync: called by the client after every sign-in.
pub async fn sync(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Option<Json<LoginProfile>>,
) -> axum::response::Response {
    let overrides = body.map(|Json(p)| p).unwrap_or_default();
    match services
        .portal_users
        .sync(principal.principal(), overrides, Utc::now())
        .await
    {
        Ok(user) => (StatusCode::OK, Json(dto::me_to_json(&user))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// GET /users/portal/me
pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.portal_users.get(principal.uid()).await {
        Ok(Some(user)) => (StatusCode::OK, Json(dto::me_to_json(&user))).into_response(),
        Ok(None) => errors::json_error(
            StatusCode::FORBIDDEN,
            "profile_not_found",
            "forbidden: portal profile not found",
        ),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_users(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.portal_users.list().await {
        Ok(users) => (StatusCode::OK, Json(serde_json::json!({ "items": users }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// PUT /users/portal/users/:uid with `{ role?, permissions? }`.
pub async fn update_access(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(uid): Path<String>,
    Json(body): Json<AccessChange>,
) -> axum::response::Response {
    let uid = match PortalUid::parse(uid) {
        Ok(uid) => uid,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services
        .portal_users
        .update_access(actor.profile(), &uid, body)
        .await
    {
        Ok(user) => (StatusCode::OK, Json(serde_json::json!({ "user": user }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
