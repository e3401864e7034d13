//! Roster member records.
//!
//! A member lives in exactly one of two collections at a time: pending
//! (awaiting approval) or live. The record shape is open; only `code` and
//! `fullName` are required, every other field is carried verbatim.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attendance::AttendanceSummary;
use crate::error::{DomainError, DomainResult};
use crate::id::MemberCode;

/// Top-level fields of a JSON record.
pub type Fields = serde_json::Map<String, Value>;

/// A roster member (student/attendee) record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub code: MemberCode,

    #[serde(rename = "fullName")]
    pub full_name: String,

    /// Every other field, preserved as-is.
    #[serde(flatten)]
    pub extra: Fields,
}

impl Member {
    /// Decode a stored or submitted record.
    pub fn from_value(value: Value) -> DomainResult<Self> {
        let Value::Object(fields) = value else {
            return Err(DomainError::validation("member record must be a JSON object"));
        };
        Self::from_fields(fields)
    }

    pub fn from_fields(fields: Fields) -> DomainResult<Self> {
        match fields.get("code") {
            Some(Value::String(s)) if !s.is_empty() => {}
            _ => return Err(DomainError::validation("code and fullName are required fields")),
        }
        match fields.get("fullName") {
            Some(Value::String(s)) if !s.trim().is_empty() => {}
            _ => return Err(DomainError::validation("code and fullName are required fields")),
        }

        serde_json::from_value(Value::Object(fields))
            .map_err(|e| DomainError::validation(format!("invalid member record: {e}")))
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.to_fields())
    }

    pub fn to_fields(&self) -> Fields {
        let mut fields = self.extra.clone();
        fields.insert("code".to_string(), Value::String(self.code.to_string()));
        fields.insert("fullName".to_string(), Value::String(self.full_name.clone()));
        fields
    }

    /// Study level (e.g. "حضانة"), if recorded.
    pub fn level(&self) -> Option<&str> {
        self.extra.get("level").and_then(Value::as_str)
    }

    pub fn attendance_summary(&self) -> AttendanceSummary {
        AttendanceSummary::for_member(self)
    }
}

/// Apply a partial top-level update to a stored record.
///
/// `code` is immutable once assigned, so a `code` key in the patch is
/// ignored. Only the patch is validated: a `fullName` it carries must be a
/// non-blank string. The stored fields are taken as they are.
pub fn merge_patch(mut record: Fields, patch: &Fields) -> DomainResult<Fields> {
    if let Some(name) = patch.get("fullName") {
        match name {
            Value::String(s) if !s.trim().is_empty() => {}
            _ => return Err(DomainError::validation("fullName must not be blank")),
        }
    }
    for (key, value) in patch {
        if key == "code" {
            continue;
        }
        record.insert(key.clone(), value.clone());
    }
    Ok(record)
}

/// Strip the immutable `code` key from a patch before it reaches the store.
pub fn without_code(mut patch: Fields) -> Fields {
    patch.remove("code");
    patch
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn jane() -> Value {
        json!({ "code": "20240101", "fullName": "Jane Doe", "level": "حضانة" })
    }

    #[test]
    fn record_round_trips_verbatim() {
        let member = Member::from_value(jane()).unwrap();
        assert_eq!(member.code.as_str(), "20240101");
        assert_eq!(member.level(), Some("حضانة"));
        assert_eq!(member.to_value(), jane());
    }

    #[test]
    fn code_and_full_name_are_required() {
        let err = Member::from_value(json!({ "code": "1" })).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = Member::from_value(json!({ "fullName": "X" })).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = Member::from_value(json!([1, 2])).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn invalid_code_is_rejected() {
        let err = Member::from_value(json!({ "code": "a/b", "fullName": "X" })).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn merge_keeps_code_and_overwrites_fields() {
        let Value::Object(record) = jane() else { unreachable!() };
        let patch = json!({ "code": "other", "level": "ثانوى", "phoneNumber": "0100" });
        let Value::Object(patch) = patch else { unreachable!() };

        let merged = merge_patch(record, &patch).unwrap();
        assert_eq!(merged["code"], "20240101");
        assert_eq!(merged["level"], "ثانوى");
        assert_eq!(merged["phoneNumber"], "0100");
        assert_eq!(merged["fullName"], "Jane Doe");
    }

    #[test]
    fn merge_rejects_blank_full_name() {
        let Value::Object(record) = jane() else { unreachable!() };
        let Value::Object(patch) = json!({ "fullName": "  " }) else { unreachable!() };
        assert!(merge_patch(record, &patch).is_err());
    }

    #[test]
    fn merge_accepts_records_missing_required_fields() {
        let Value::Object(record) = json!({ "code": "1", "name": "x" }) else { unreachable!() };
        let Value::Object(patch) = json!({ "level": "ابتدائي" }) else { unreachable!() };
        let merged = merge_patch(record, &patch).unwrap();
        assert_eq!(merged["name"], "x");
        assert_eq!(merged["level"], "ابتدائي");
    }

    #[test]
    fn without_code_drops_only_code() {
        let Value::Object(patch) = json!({ "code": "x", "level": "y" }) else { unreachable!() };
        let patch = without_code(patch);
        assert!(!patch.contains_key("code"));
        assert_eq!(patch["level"], "y");
    }
}
