//! Server-side permission guard.
//!
//! Runs after the auth middleware and before any handler, so a denied
//! request never reaches a store write.

use std::sync::Arc;

use axum::{extract::State, middleware::Next, response::Response, Router};

use portal_auth::{Action, Module, authorize, authorize_admin};

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::{ActorContext, PrincipalContext};

/// What a guarded route demands of its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Permission(Module, Action),
    /// `admin` or `super_admin` role.
    Admin,
}

impl core::fmt::Display for Requirement {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Requirement::Permission(module, action) => write!(f, "{module}.{action}"),
            Requirement::Admin => f.write_str("admin"),
        }
    }
}

#[derive(Clone)]
pub struct PermissionGuard {
    services: Arc<AppServices>,
    requirement: Requirement,
}

pub async fn check_permission(
    State(guard): State<PermissionGuard>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let principal = req.extensions().get::<PrincipalContext>().cloned();

    let profile = match &principal {
        Some(p) => match guard.services.portal_users.get(p.uid()).await {
            Ok(profile) => profile,
            Err(e) => return errors::service_error_to_response(e),
        },
        None => None,
    };

    let principal_ref = principal.as_ref().map(PrincipalContext::principal);
    let decision = match guard.requirement {
        Requirement::Permission(module, action) => authorize(principal_ref, profile.as_ref(), module, action),
        Requirement::Admin => authorize_admin(principal_ref, profile.as_ref()),
    };

    if let Err(e) = decision {
        tracing::warn!(
            uid = principal.as_ref().map(|p| p.uid().as_str()).unwrap_or("-"),
            requirement = %guard.requirement,
            error = %e,
            "request denied"
        );
        return errors::authz_error_to_response(e);
    }

    if let Some(profile) = profile {
        req.extensions_mut().insert(ActorContext::new(profile));
    }
    next.run(req).await
}

/// Put every route of `router` behind `requirement`.
pub fn guarded(router: Router, services: &Arc<AppServices>, requirement: Requirement) -> Router {
    let guard = PermissionGuard {
        services: services.clone(),
        requirement,
    };
    router.route_layer(axum::middleware::from_fn_with_state(guard, check_permission))
}
