//! The permission gate.
//!
//! - No IO
//! - No panics
//! - No business logic (pure policy check)

use thiserror::Error;

use crate::permissions::{Action, Module, PermissionMatrix};
use crate::principal::Principal;
use crate::user::PortalUser;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    /// No (valid) credential was presented.
    #[error("unauthenticated")]
    Unauthenticated,

    /// Valid credential, but the caller has no portal profile.
    #[error("forbidden: portal profile not found")]
    ProfileNotFound,

    /// A profile is stored but cannot be read (e.g. an unknown permission key).
    #[error("forbidden: portal profile is unreadable")]
    ProfileUnreadable,

    /// The resolved profile belongs to someone else.
    #[error("forbidden: profile does not belong to the authenticated principal")]
    ProfileMismatch,

    #[error("forbidden: you do not have permission to {action} {module}")]
    Forbidden { module: Module, action: Action },

    #[error("forbidden: admin role required")]
    AdminRequired,

    #[error("forbidden: {0}")]
    PrivilegeEscalation(String),
}

/// Decide whether `actor` may perform `action` on `module`.
///
/// 1. no actor → deny
/// 2. `admin` / `super_admin` → allow, whatever the matrix says
/// 3. `permissions[module][action] == true` → allow
/// 4. anything else → deny
pub fn allowed(actor: Option<&PortalUser>, module: Module, action: Action) -> bool {
    let Some(actor) = actor else {
        return false;
    };
    if actor.role.is_admin() {
        return true;
    }
    actor
        .permissions
        .as_ref()
        .is_some_and(|p| p.grants(module, action))
}

fn resolve<'a>(
    principal: Option<&Principal>,
    profile: Option<&'a PortalUser>,
) -> Result<&'a PortalUser, AuthzError> {
    let principal = principal.ok_or(AuthzError::Unauthenticated)?;
    let profile = profile.ok_or(AuthzError::ProfileNotFound)?;
    if profile.uid != principal.uid {
        return Err(AuthzError::ProfileMismatch);
    }
    Ok(profile)
}

/// Authorize an authenticated principal against its stored profile.
///
/// A principal without a profile is rejected outright rather than granted
/// implicit read access.
pub fn authorize(
    principal: Option<&Principal>,
    profile: Option<&PortalUser>,
    module: Module,
    action: Action,
) -> Result<(), AuthzError> {
    let actor = resolve(principal, profile)?;
    if allowed(Some(actor), module, action) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden { module, action })
    }
}

/// Authorize operations reserved to the admin roles (portal account management).
pub fn authorize_admin(principal: Option<&Principal>, profile: Option<&PortalUser>) -> Result<(), AuthzError> {
    let actor = resolve(principal, profile)?;
    if actor.role.is_admin() {
        Ok(())
    } else {
        Err(AuthzError::AdminRequired)
    }
}

/// The fully resolved matrix for `actor`, every module and action present.
///
/// Handed to the client so it can hide affordances; the server still checks
/// every mutation itself.
pub fn effective_permissions(actor: &PortalUser) -> PermissionMatrix {
    let mut matrix = PermissionMatrix::empty();
    for module in Module::ALL {
        for action in Action::ALL {
            matrix.set(module, action, allowed(Some(actor), module, action));
        }
    }
    matrix
}
