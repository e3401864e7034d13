use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use portal_core::PortalUid;

/// Identity-token claims (transport-agnostic).
///
/// The minimal set the portal expects once a bearer token has been decoded.
/// Timestamps are encoded as seconds since the epoch, as in any JWT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Subject: the identity provider's stable user id.
    pub sub: PortalUid,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,

    /// Issued-at timestamp.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub iat: DateTime<Utc>,

    /// Expiration timestamp.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub exp: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (iat is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,
}

/// Deterministically validate token claims.
///
/// Note: this validates the *claims* only. Signature verification happens in
/// a [`TokenVerifier`].
pub fn validate_claims(claims: &IdTokenClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

/// Turns a bearer credential into verified claims.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<IdTokenClaims, TokenValidationError>;
}

/// HS256 shared-secret verifier.
pub struct Hs256TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256TokenVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Time checks run in `validate_claims` against the caller's clock.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }
}

impl TokenVerifier for Hs256TokenVerifier {
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<IdTokenClaims, TokenValidationError> {
        let data = jsonwebtoken::decode::<IdTokenClaims>(token, &self.key, &self.validation)
            .map_err(|e| TokenValidationError::Malformed(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header};

    fn claims(now: DateTime<Utc>) -> IdTokenClaims {
        IdTokenClaims {
            sub: PortalUid::parse("uid-1").unwrap(),
            email: Some("a@example.com".to_string()),
            name: None,
            picture: None,
            iat: now - Duration::minutes(1),
            exp: now + Duration::minutes(10),
        }
    }

    fn mint(secret: &str, claims: &IdTokenClaims) -> String {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_round_trips() {
        let now = Utc::now();
        let c = claims(now);
        let verifier = Hs256TokenVerifier::new("secret");

        let decoded = verifier.verify(&mint("secret", &c), now).unwrap();
        assert_eq!(decoded.sub, c.sub);
        assert_eq!(decoded.email, c.email);
    }

    #[test]
    fn wrong_secret_is_malformed() {
        let now = Utc::now();
        let verifier = Hs256TokenVerifier::new("secret");
        let err = verifier.verify(&mint("other", &claims(now)), now).unwrap_err();
        assert!(matches!(err, TokenValidationError::Malformed(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Utc::now();
        let verifier = Hs256TokenVerifier::new("secret");
        let token = mint("secret", &claims(now));
        let err = verifier.verify(&token, now + Duration::hours(1)).unwrap_err();
        assert_eq!(err, TokenValidationError::Expired);
    }

    #[test]
    fn time_window_is_checked() {
        let now = Utc::now();
        let mut c = claims(now);
        c.exp = c.iat;
        assert_eq!(validate_claims(&c, now), Err(TokenValidationError::InvalidTimeWindow));

        let c = claims(now);
        assert_eq!(
            validate_claims(&c, now - Duration::hours(1)),
            Err(TokenValidationError::NotYetValid)
        );
    }

    #[test]
    fn garbage_is_malformed() {
        let verifier = Hs256TokenVerifier::new("secret");
        assert!(matches!(
            verifier.verify("not-a-jwt", Utc::now()),
            Err(TokenValidationError::Malformed(_))
        ));
    }
}
