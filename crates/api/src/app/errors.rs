use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use portal_auth::AuthzError;
use portal_core::DomainError;
use portal_infra::{NotifyError, PromotionError, ServiceError, StoreError};

pub fn authz_error_to_response(err: AuthzError) -> axum::response::Response {
    let code = match &err {
        AuthzError::Unauthenticated => {
            return json_error(StatusCode::UNAUTHORIZED, "unauthenticated", err.to_string());
        }
        AuthzError::ProfileNotFound => "profile_not_found",
        AuthzError::ProfileUnreadable => "profile_unreadable",
        AuthzError::ProfileMismatch | AuthzError::Forbidden { .. } => "forbidden",
        AuthzError::AdminRequired => "admin_required",
        AuthzError::PrivilegeEscalation(_) => "privilege_escalation",
    };
    json_error(StatusCode::FORBIDDEN, code, err.to_string())
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    tracing::error!(error = %err, "store failure");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", err.to_string())
}

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Store(e) => store_error_to_response(e),
        ServiceError::Authz(e) => authz_error_to_response(e),
    }
}

pub fn promotion_error_to_response(err: PromotionError) -> axum::response::Response {
    match &err {
        PromotionError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", err.to_string()),
        PromotionError::Conflict(_) => json_error(StatusCode::CONFLICT, "conflict", err.to_string()),
        PromotionError::Store { step, .. } => {
            tracing::error!(error = %err, step = %step, "approval failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                axum::Json(json!({
                    "error": "store_failure",
                    "message": err.to_string(),
                    "step": step,
                })),
            )
                .into_response()
        }
    }
}

pub fn notify_error_to_response(err: NotifyError) -> axum::response::Response {
    tracing::error!(error = %err, "notification dispatch failed");
    json_error(StatusCode::BAD_GATEWAY, "dispatch_failed", err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
