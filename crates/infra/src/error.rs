use thiserror::Error;

use portal_auth::AuthzError;
use portal_core::DomainError;

use crate::store::StoreError;

/// Failure of a directory/content service call.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Authz(#[from] AuthzError),
}

impl ServiceError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::Domain(DomainError::not_found(msg))
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Domain(DomainError::conflict(msg))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Domain(DomainError::validation(msg))
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
