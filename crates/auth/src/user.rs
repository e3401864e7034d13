//! Portal (staff/admin) account profile.
//!
//! A profile is created on first login, refreshed on every later login, and
//! its access (role + permission matrix) only changes through an explicit
//! admin edit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use portal_core::PortalUid;

use crate::authorize::AuthzError;
use crate::permissions::PermissionMatrix;
use crate::principal::LoginProfile;
use crate::roles::Role;

/// A staff/admin account, distinct from roster members.
///
/// # Invariants
/// - `uid` never changes.
/// - The login path never touches `role` or `permissions`.
/// - Nobody changes their own role; only a super admin grants or revokes
///   `super_admin`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalUser {
    pub uid: PortalUid,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default, rename = "photoURL")]
    pub photo_url: Option<String>,

    #[serde(default)]
    pub role: Role,

    /// May be absent on legacy or hand-edited records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<PermissionMatrix>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

impl PortalUser {
    /// Profile created by the first successful login.
    pub fn first_login(uid: PortalUid, profile: LoginProfile, role: Role, now: DateTime<Utc>) -> Self {
        Self {
            uid,
            email: profile.email,
            display_name: profile.display_name,
            photo_url: profile.photo_url,
            role,
            permissions: Some(PermissionMatrix::staff_default()),
            created_at: Some(now),
            last_login: Some(now),
        }
    }

    /// Refresh identity fields on a later login. Access is left untouched.
    pub fn record_login(&mut self, profile: LoginProfile, now: DateTime<Utc>) {
        self.email = profile.email;
        self.display_name = profile.display_name;
        self.photo_url = profile.photo_url;
        self.last_login = Some(now);
    }

    /// Apply an explicit admin edit of role and/or permissions.
    pub fn apply_access_change(&mut self, change: &AccessChange, actor: &PortalUser) -> Result<(), AuthzError> {
        if !actor.role.is_admin() {
            return Err(AuthzError::AdminRequired);
        }

        let touches_super_admin = self.role == Role::SuperAdmin || change.role == Some(Role::SuperAdmin);
        if touches_super_admin && actor.role != Role::SuperAdmin {
            return Err(AuthzError::PrivilegeEscalation(
                "only a super admin can manage super admin accounts".to_string(),
            ));
        }

        if let Some(role) = change.role {
            if role != self.role && actor.uid == self.uid {
                return Err(AuthzError::PrivilegeEscalation(
                    "cannot change your own role".to_string(),
                ));
            }
            self.role = role;
        }

        if let Some(permissions) = &change.permissions {
            self.permissions = Some(permissions.clone());
        }

        Ok(())
    }
}

/// An explicit admin edit of a portal account's access.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccessChange {
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub permissions: Option<PermissionMatrix>,
}

impl AccessChange {
    pub fn is_empty(&self) -> bool {
        self.role.is_none() && self.permissions.is_none()
    }
}
