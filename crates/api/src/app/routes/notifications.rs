use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use portal_auth::{Action, Module};
use portal_infra::{Notification, broadcast};

use crate::app::{dto, errors, services::AppServices};
use crate::authz::{Requirement, guarded};

pub fn router(services: &Arc<AppServices>) -> Router {
    guarded(
        Router::new().route("/send-notification", post(send_notification)),
        services,
        Requirement::Permission(Module::Users, Action::Edit),
    )
}

/// POST /users/send-notification
pub async fn send_notification(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::SendNotificationRequest>,
) -> axum::response::Response {
    let notification = match Notification::new(body.title.clone(), body.text()) {
        Ok(n) => n,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match broadcast(services.notifier.as_ref(), &notification).await {
        Ok(receipt) => (StatusCode::OK, Json(dto::receipt_to_json(&receipt))).into_response(),
        Err(e) => errors::notify_error_to_response(e),
    }
}
