use serde::Deserialize;
use serde_json::{Value, json};

use portal_auth::{PortalUser, effective_permissions};
use portal_core::Member;
use portal_infra::{BulkUpdateReport, DispatchReceipt, Promotion, PromotionOutcome};

#[derive(Debug, Deserialize)]
pub struct AttendanceQuery {
    pub level: Option<String>,
}

/// Broadcast request. `message` is accepted in place of `body`.
#[derive(Debug, Deserialize)]
pub struct SendNotificationRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl SendNotificationRequest {
    pub fn text(&self) -> &str {
        self.body.as_deref().or(self.message.as_deref()).unwrap_or_default()
    }
}

pub fn member_created_to_json(member: &Member) -> Value {
    json!({
        "message": "User created successfully",
        "user": member,
    })
}

pub fn member_updated_to_json(member: &Value) -> Value {
    json!({
        "message": "User updated successfully",
        "user": member,
    })
}

pub fn bulk_report_to_json(report: &BulkUpdateReport) -> Value {
    json!({
        "message": format!(
            "Bulk update completed. Successful: {}, Failed: {}",
            report.successful.len(),
            report.failed.len()
        ),
        "results": report,
    })
}

pub fn promotion_to_json(promotion: &Promotion) -> Value {
    let message = match promotion.outcome {
        PromotionOutcome::AlreadyPromoted => "User was already approved",
        PromotionOutcome::Promoted | PromotionOutcome::Replaced => "User approved successfully",
    };
    json!({
        "message": message,
        "outcome": promotion.outcome,
        "user": promotion.member,
    })
}

/// Profile plus the resolved matrix the client uses to hide controls.
pub fn me_to_json(user: &PortalUser) -> Value {
    json!({
        "user": user,
        "permissions": effective_permissions(user),
    })
}

pub fn receipt_to_json(receipt: &DispatchReceipt) -> Value {
    json!({
        "success": true,
        "response": receipt,
    })
}
