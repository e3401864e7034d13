//! Strongly-typed identifiers used across the domain.
//!
//! All identifiers are string keys in the hierarchical record store, so they
//! share one validation rule: non-empty, no surrounding whitespace, and none of
//! the characters the store reserves for paths (`/ . # $ [ ]`).

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

const RESERVED: &[char] = &['/', '.', '#', '$', '[', ']'];

/// Key of a roster member, shared by the pending and live collections.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MemberCode(String);

/// Identity-provider subject id of a portal (staff/admin) account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PortalUid(String);

/// Identifier of a document inside a content collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

fn validate_key(name: &str, raw: &str) -> Result<(), DomainError> {
    if raw.is_empty() {
        return Err(DomainError::invalid_id(format!("{name}: must not be empty")));
    }
    if raw.trim() != raw {
        return Err(DomainError::invalid_id(format!(
            "{name}: must not start or end with whitespace"
        )));
    }
    if let Some(c) = raw.chars().find(|c| RESERVED.contains(c) || c.is_control()) {
        return Err(DomainError::invalid_id(format!(
            "{name}: character {c:?} is not allowed"
        )));
    }
    Ok(())
}

macro_rules! impl_key_newtype {
    ($t:ident, $name:literal) => {
        impl $t {
            /// Parse and validate an identifier.
            pub fn parse(raw: impl Into<String>) -> Result<Self, DomainError> {
                let raw = raw.into();
                validate_key($name, &raw)?;
                Ok(Self(raw))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $t {
            type Error = DomainError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(value)
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }
    };
}

impl_key_newtype!(MemberCode, "MemberCode");
impl_key_newtype!(PortalUid, "PortalUid");
impl_key_newtype!(DocumentId, "DocumentId");

impl MemberCode {
    /// Generate a code from a registration timestamp (`YYYYMMDDHHMMSS`).
    ///
    /// Codes are assigned once and never change afterwards.
    pub fn generate(at: DateTime<Utc>) -> Self {
        Self(at.format("%Y%m%d%H%M%S").to_string())
    }
}

impl DocumentId {
    /// Generate a fresh, time-ordered document id.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().simple().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn member_code_is_generated_from_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 9, 5, 7).unwrap();
        assert_eq!(MemberCode::generate(at).as_str(), "20240101090507");
    }

    #[test]
    fn reserved_path_characters_are_rejected() {
        for raw in ["a/b", "a.b", "a#b", "a$b", "a[b", "a]b"] {
            let err = MemberCode::parse(raw).unwrap_err();
            assert!(matches!(err, DomainError::InvalidId(_)), "{raw} accepted");
        }
    }

    #[test]
    fn empty_and_padded_keys_are_rejected() {
        assert!(PortalUid::parse("").is_err());
        assert!(PortalUid::parse(" uid").is_err());
        assert!(PortalUid::parse("uid-123").is_ok());
    }

    #[test]
    fn serde_validates_on_deserialize() {
        let ok: MemberCode = serde_json::from_str("\"20240101\"").unwrap();
        assert_eq!(ok.as_str(), "20240101");

        let bad = serde_json::from_str::<MemberCode>("\"a/b\"");
        assert!(bad.is_err());
    }

    #[test]
    fn generated_document_ids_are_valid_keys() {
        let id = DocumentId::generate();
        assert!(DocumentId::parse(id.as_str()).is_ok());
    }
}
