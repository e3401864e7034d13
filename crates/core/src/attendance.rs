//! Attendance report over live roster members.

use serde::Serialize;
use serde_json::Value;

use crate::id::MemberCode;
use crate::member::Member;

/// Attendance status as recorded by the check-in app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
    Unknown,
}

impl AttendanceStatus {
    /// Map the stored (Arabic) status label.
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "تم الحضور" => Self::Present,
            "متأخر" => Self::Late,
            "غائب" => Self::Absent,
            _ => Self::Unknown,
        }
    }
}

/// Which study level the report covers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LevelFilter {
    #[default]
    All,
    Level(String),
}

impl LevelFilter {
    /// `None`, empty and `"all"` select every level.
    pub fn from_query(level: Option<&str>) -> Self {
        match level.map(str::trim) {
            None | Some("") | Some("all") => Self::All,
            Some(level) => Self::Level(level.to_string()),
        }
    }

    pub fn matches(&self, member: &Member) -> bool {
        match self {
            Self::All => true,
            Self::Level(level) => member.level() == Some(level.as_str()),
        }
    }
}

/// Per-member attendance counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    pub code: MemberCode,
    pub full_name: String,
    pub level: Option<String>,
    pub total: usize,
    pub present: usize,
    pub late: usize,
    pub absent: usize,
    /// Most recent entry; the check-in app prepends new entries.
    pub latest: Option<Value>,
}

impl AttendanceSummary {
    pub fn for_member(member: &Member) -> Self {
        let entries = attendance_entries(member);

        let mut summary = Self {
            code: member.code.clone(),
            full_name: member.full_name.clone(),
            level: member.level().map(str::to_string),
            total: entries.len(),
            present: 0,
            late: 0,
            absent: 0,
            latest: entries.first().map(|e| (*e).clone()),
        };

        for entry in entries {
            let status = entry
                .get("status")
                .and_then(Value::as_str)
                .map(AttendanceStatus::from_label)
                .unwrap_or(AttendanceStatus::Unknown);
            match status {
                AttendanceStatus::Present => summary.present += 1,
                AttendanceStatus::Late => summary.late += 1,
                AttendanceStatus::Absent => summary.absent += 1,
                AttendanceStatus::Unknown => {}
            }
        }

        summary
    }
}

// The record store turns sparse arrays into objects keyed by index, so both
// shapes are accepted.
fn attendance_entries(member: &Member) -> Vec<&Value> {
    match member.extra.get("attendance") {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Object(items)) => items.values().collect(),
        _ => Vec::new(),
    }
}

/// Build the attendance report for the selected level.
pub fn report<'a>(
    members: impl IntoIterator<Item = &'a Member>,
    filter: &LevelFilter,
) -> Vec<AttendanceSummary> {
    members
        .into_iter()
        .filter(|m| filter.matches(m))
        .map(AttendanceSummary::for_member)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn member(code: &str, level: &str, attendance: Value) -> Member {
        Member::from_value(json!({
            "code": code,
            "fullName": format!("Member {code}"),
            "level": level,
            "attendance": attendance,
        }))
        .unwrap()
    }

    #[test]
    fn counts_each_status() {
        let m = member(
            "1",
            "حضانة",
            json!([
                { "status": "تم الحضور", "dateTime": "2024-03-01T10:00:00" },
                { "status": "متأخر", "dateTime": "2024-02-23T10:00:00" },
                { "status": "غائب", "dateTime": "2024-02-16T10:00:00" },
                { "status": "تم الحضور", "dateTime": "2024-02-09T10:00:00" },
            ]),
        );

        let s = m.attendance_summary();
        assert_eq!(s.total, 4);
        assert_eq!(s.present, 2);
        assert_eq!(s.late, 1);
        assert_eq!(s.absent, 1);
        assert_eq!(s.latest.unwrap()["dateTime"], "2024-03-01T10:00:00");
    }

    #[test]
    fn object_shaped_attendance_is_accepted() {
        let m = member("1", "حضانة", json!({ "0": { "status": "غائب" } }));
        let s = m.attendance_summary();
        assert_eq!(s.total, 1);
        assert_eq!(s.absent, 1);
    }

    #[test]
    fn missing_attendance_yields_zeroes() {
        let m = Member::from_value(json!({ "code": "1", "fullName": "X" })).unwrap();
        let s = m.attendance_summary();
        assert_eq!(s.total, 0);
        assert!(s.latest.is_none());
    }

    #[test]
    fn report_filters_by_level() {
        let members = vec![
            member("1", "حضانة", json!([])),
            member("2", "ثانوى", json!([])),
        ];

        let all = report(&members, &LevelFilter::from_query(Some("all")));
        assert_eq!(all.len(), 2);

        let one = report(&members, &LevelFilter::from_query(Some("ثانوى")));
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].code.as_str(), "2");
    }
}
