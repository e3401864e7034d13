//! `portal-auth`: pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it decides,
//! it never fetches.

pub mod authorize;
pub mod claims;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod user;

pub use authorize::{AuthzError, allowed, authorize, authorize_admin, effective_permissions};
pub use claims::{Hs256TokenVerifier, IdTokenClaims, TokenValidationError, TokenVerifier, validate_claims};
pub use permissions::{Action, ActionGrants, Module, PermissionMatrix, UnknownKey};
pub use principal::{LoginProfile, Principal};
pub use roles::Role;
pub use user::{AccessChange, PortalUser};
