use portal_auth::{PortalUser, Principal};
use portal_core::PortalUid;

/// Principal context for a request (the verified token identity).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn uid(&self) -> &PortalUid {
        &self.principal.uid
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }
}

/// The caller's portal profile, resolved by the permission guard.
///
/// Only present on guarded routes, after the check passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorContext {
    profile: PortalUser,
}

impl ActorContext {
    pub fn new(profile: PortalUser) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &PortalUser {
        &self.profile
    }
}
