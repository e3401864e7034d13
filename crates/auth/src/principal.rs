use serde::{Deserialize, Serialize};

use portal_core::PortalUid;

use crate::claims::IdTokenClaims;

/// Identity of an authenticated caller, as proven by a verified token.
///
/// This is what request handlers receive; it carries no authorization data.
/// Roles and permissions live on the caller's [`crate::PortalUser`] profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub uid: PortalUid,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

impl Principal {
    pub fn from_claims(claims: &IdTokenClaims) -> Self {
        Self {
            uid: claims.sub.clone(),
            email: claims.email.clone(),
            display_name: claims.name.clone(),
            photo_url: claims.picture.clone(),
        }
    }

    /// Identity fields to record on login, with `overrides` (client supplied)
    /// taking precedence over what the token carries.
    pub fn login_profile(&self, overrides: LoginProfile) -> LoginProfile {
        LoginProfile {
            email: overrides.email.or_else(|| self.email.clone()),
            display_name: overrides
                .display_name
                .or_else(|| self.display_name.clone())
                .or_else(|| default_display_name(self.email.as_deref())),
            photo_url: overrides.photo_url.or_else(|| self.photo_url.clone()),
        }
    }
}

/// Descriptive identity fields refreshed on every login.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginProfile {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, rename = "photoURL")]
    pub photo_url: Option<String>,
}

// Accounts without a display name show the local part of their email.
fn default_display_name(email: Option<&str>) -> Option<String> {
    let local = email?.split('@').next()?;
    (!local.is_empty()).then(|| local.to_string())
}
