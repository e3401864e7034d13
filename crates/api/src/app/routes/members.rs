use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::Utc;

use portal_auth::{Action, Module};
use portal_core::{Fields, LevelFilter, MemberCode};

use crate::app::{dto, errors, services::AppServices};
use crate::authz::{Requirement, guarded};

pub fn router(services: &Arc<AppServices>) -> Router {
    let view = Router::new()
        .route("/", get(list_members))
        .route("/pending", get(list_pending))
        .route("/:code", get(get_member));

    let attendance = Router::new().route("/attendance-report", get(attendance_report));

    let edit = Router::new()
        .route("/", post(create_member))
        .route("/:code", put(update_member))
        .route("/bulk-update", post(bulk_update))
        .route("/approve/:code", post(approve_member));

    let remove = Router::new()
        .route("/:code", delete(delete_member))
        .route("/pending/:code", delete(reject_pending));

    Router::new()
        .merge(guarded(view, services, Requirement::Permission(Module::Users, Action::View)))
        .merge(guarded(attendance, services, Requirement::Permission(Module::Attendance, Action::View)))
        .merge(guarded(edit, services, Requirement::Permission(Module::Users, Action::Edit)))
        .merge(guarded(remove, services, Requirement::Permission(Module::Users, Action::Delete)))
}

fn parse_code(raw: String) -> Result<MemberCode, axum::response::Response> {
    MemberCode::parse(raw).map_err(errors::domain_error_to_response)
}

pub async fn list_members(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.members.list_members().await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_pending(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.members.list_pending().await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_member(
    Extension(services): Extension<Arc<AppServices>>,
    Path(code): Path<String>,
) -> axum::response::Response {
    let code = match parse_code(code) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match services.members.get_member(&code).await {
        Ok(member) => (StatusCode::OK, Json(member)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// GET /users/attendance-report?level=
pub async fn attendance_report(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::AttendanceQuery>,
) -> axum::response::Response {
    let filter = LevelFilter::from_query(query.level.as_deref());
    match services.members.attendance_report(&filter).await {
        Ok(rows) => (StatusCode::OK, Json(serde_json::json!({ "items": rows }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// POST /users: registers into the pending collection.
pub async fn create_member(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<Fields>,
) -> axum::response::Response {
    match services.members.register_pending(body, Utc::now()).await {
        Ok(member) => (StatusCode::CREATED, Json(dto::member_created_to_json(&member))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_member(
    Extension(services): Extension<Arc<AppServices>>,
    Path(code): Path<String>,
    Json(body): Json<Fields>,
) -> axum::response::Response {
    let code = match parse_code(code) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match services.members.update_member(&code, body).await {
        Ok(member) => (StatusCode::OK, Json(dto::member_updated_to_json(&member))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// POST /users/bulk-update: body is an array of pending-record patches.
pub async fn bulk_update(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<Vec<Fields>>,
) -> axum::response::Response {
    let report = services.members.bulk_update_pending(body).await;
    (StatusCode::OK, Json(dto::bulk_report_to_json(&report))).into_response()
}

/// POST /users/approve/:code
pub async fn approve_member(
    Extension(services): Extension<Arc<AppServices>>,
    Path(code): Path<String>,
) -> axum::response::Response {
    let code = match parse_code(code) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match services.promotion.approve(&code).await {
        Ok(promotion) => (StatusCode::OK, Json(dto::promotion_to_json(&promotion))).into_response(),
        Err(e) => errors::promotion_error_to_response(e),
    }
}

pub async fn delete_member(
    Extension(services): Extension<Arc<AppServices>>,
    Path(code): Path<String>,
) -> axum::response::Response {
    let code = match parse_code(code) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match services.members.delete_member(&code).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "message": "User deleted successfully" })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn reject_pending(
    Extension(services): Extension<Arc<AppServices>>,
    Path(code): Path<String>,
) -> axum::response::Response {
    let code = match parse_code(code) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match services.members.reject_pending(&code).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "message": "Pending user rejected" })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
