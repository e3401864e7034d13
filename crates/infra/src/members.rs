//! Member roster: live members, pending registrations and attendance.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use portal_core::attendance::report;
use portal_core::member::{merge_patch, without_code};
use portal_core::{AttendanceSummary, Fields, LevelFilter, Member, MemberCode};

use crate::error::{ServiceError, ServiceResult};
use crate::store::{Collection, RecordPath, RecordStore, StoreError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkUpdated {
    pub code: MemberCode,
    pub user: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkFailed {
    pub user: Value,
    pub error: String,
}

/// Per-entry outcome of a bulk pending update.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BulkUpdateReport {
    pub successful: Vec<BulkUpdated>,
    pub failed: Vec<BulkFailed>,
}

#[derive(Debug, Clone)]
pub struct MemberDirectory<S> {
    store: S,
}

impl<S> MemberDirectory<S>
where
    S: RecordStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn list_members(&self) -> ServiceResult<BTreeMap<String, Value>> {
        Ok(self.store.list(Collection::Members).await?)
    }

    pub async fn list_pending(&self) -> ServiceResult<BTreeMap<String, Value>> {
        Ok(self.store.list(Collection::PendingMembers).await?)
    }

    /// The stored record as-is.
    pub async fn get_member(&self, code: &MemberCode) -> ServiceResult<Value> {
        self.store
            .get(&RecordPath::member(code))
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("member {code} not found")))
    }

    /// Add a registration to the pending collection.
    ///
    /// A record without a code gets one derived from `now`.
    #[tracing::instrument(skip(self, record, now))]
    pub async fn register_pending(&self, mut record: Fields, now: DateTime<Utc>) -> ServiceResult<Member> {
        if matches!(record.get("code"), None | Some(Value::Null)) {
            record.insert("code".to_string(), Value::String(MemberCode::generate(now).to_string()));
        }
        let member = Member::from_fields(record)?;

        for path in [RecordPath::pending(&member.code), RecordPath::member(&member.code)] {
            if self.store.get(&path).await?.is_some() {
                return Err(ServiceError::conflict(format!("code {} is already in use", member.code)));
            }
        }

        self.store
            .set(&RecordPath::pending(&member.code), member.to_value())
            .await?;
        tracing::info!(code = %member.code, "pending member registered");
        Ok(member)
    }

    /// Merge `patch` into a live member. `code` in the patch is ignored.
    #[tracing::instrument(skip(self, patch), fields(code = %code))]
    pub async fn update_member(&self, code: &MemberCode, patch: Fields) -> ServiceResult<Value> {
        let path = RecordPath::member(code);
        let current = self
            .fetch_fields(&path)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("member {code} not found")))?;

        let updated = merge_patch(current, &patch)?;
        self.store.update(&path, without_code(patch)).await?;
        Ok(Value::Object(updated))
    }

    /// Apply several pending-record patches; each is reported on its own.
    pub async fn bulk_update_pending(&self, patches: Vec<Fields>) -> BulkUpdateReport {
        let mut report = BulkUpdateReport::default();

        for patch in patches {
            match self.update_pending(&patch).await {
                Ok((code, user)) => report.successful.push(BulkUpdated { code, user }),
                Err(e) => {
                    tracing::warn!(error = %e, "bulk pending update entry failed");
                    report.failed.push(BulkFailed {
                        user: Value::Object(patch),
                        error: e.to_string(),
                    });
                }
            }
        }

        report
    }

    async fn update_pending(&self, patch: &Fields) -> ServiceResult<(MemberCode, Value)> {
        let code = match patch.get("code") {
            Some(Value::String(raw)) => MemberCode::parse(raw.clone())?,
            _ => return Err(ServiceError::validation("code is required")),
        };
        let path = RecordPath::pending(&code);
        let current = self
            .fetch_fields(&path)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("pending member {code} not found")))?;

        let updated = merge_patch(current, patch)?;
        self.store.update(&path, without_code(patch.clone())).await?;
        Ok((code, Value::Object(updated)))
    }

    #[tracing::instrument(skip(self), fields(code = %code))]
    pub async fn delete_member(&self, code: &MemberCode) -> ServiceResult<()> {
        self.remove(RecordPath::member(code)).await
    }

    #[tracing::instrument(skip(self), fields(code = %code))]
    pub async fn reject_pending(&self, code: &MemberCode) -> ServiceResult<()> {
        self.remove(RecordPath::pending(code)).await
    }

    /// Attendance counts for live members at `filter`'s level.
    ///
    /// Records that do not decode as members are skipped.
    pub async fn attendance_report(&self, filter: &LevelFilter) -> ServiceResult<Vec<AttendanceSummary>> {
        let records = self.store.list(Collection::Members).await?;
        let members: Vec<Member> = records
            .into_iter()
            .filter_map(|(key, value)| match Member::from_value(value) {
                Ok(member) => Some(member),
                Err(e) => {
                    tracing::warn!(%key, error = %e, "skipping malformed member record");
                    None
                }
            })
            .collect();
        Ok(report(&members, filter))
    }

    async fn fetch_fields(&self, path: &RecordPath) -> ServiceResult<Option<Fields>> {
        match self.store.get(path).await? {
            Some(Value::Object(fields)) => Ok(Some(fields)),
            Some(_) => Err(StoreError::malformed(path, "record is not a JSON object").into()),
            None => Ok(None),
        }
    }

    async fn remove(&self, path: RecordPath) -> ServiceResult<()> {
        if self.store.get(&path).await?.is_none() {
            return Err(ServiceError::not_found(format!("{path} not found")));
        }
        self.store.delete(&path).await?;
        tracing::info!(%path, "record deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use portal_core::DomainError;
    use serde_json::json;

    use super::*;
    use crate::store::InMemoryRecordStore;

    fn fields(v: Value) -> Fields {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    fn code(raw: &str) -> MemberCode {
        MemberCode::parse(raw).unwrap()
    }

    fn directory() -> MemberDirectory<InMemoryRecordStore> {
        MemberDirectory::new(InMemoryRecordStore::new())
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 8, 5, 7).unwrap()
    }

    #[tokio::test]
    async fn register_generates_missing_code() {
        let dir = directory();
        let member = dir
            .register_pending(fields(json!({ "fullName": "Mina" })), now())
            .await
            .unwrap();

        assert_eq!(member.code.as_str(), "20240309080507");
        assert!(dir.list_pending().await.unwrap().contains_key("20240309080507"));
    }

    #[tokio::test]
    async fn register_requires_full_name() {
        let dir = directory();
        let err = dir
            .register_pending(fields(json!({ "code": "1" })), now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn register_rejects_a_code_in_either_collection() {
        let dir = directory();
        dir.store
            .set(&RecordPath::member(&code("5")), json!({ "code": "5", "fullName": "A" }))
            .await
            .unwrap();

        let err = dir
            .register_pending(fields(json!({ "code": "5", "fullName": "B" })), now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn update_merges_and_keeps_code() {
        let dir = directory();
        dir.store
            .set(
                &RecordPath::member(&code("5")),
                json!({ "code": "5", "fullName": "A", "church": "St Mark" }),
            )
            .await
            .unwrap();

        let updated = dir
            .update_member(&code("5"), fields(json!({ "code": "6", "level": "ابتدائي" })))
            .await
            .unwrap();

        assert_eq!(updated["code"], "5");
        assert_eq!(updated["level"], "ابتدائي");
        assert_eq!(
            dir.store.get(&RecordPath::member(&code("5"))).await.unwrap(),
            Some(json!({ "code": "5", "fullName": "A", "church": "St Mark", "level": "ابتدائي" }))
        );
    }

    #[tokio::test]
    async fn stored_records_are_read_and_patched_without_decoding() {
        let dir = directory();
        let legacy = json!({ "code": "1", "name": "x", "attendance": [] });
        dir.store.set(&RecordPath::member(&code("1")), legacy.clone()).await.unwrap();

        assert_eq!(dir.get_member(&code("1")).await.unwrap(), legacy);

        let updated = dir
            .update_member(&code("1"), fields(json!({ "level": "حضانة" })))
            .await
            .unwrap();
        assert_eq!(updated, json!({ "code": "1", "name": "x", "attendance": [], "level": "حضانة" }));

        let err = dir
            .update_member(&code("1"), fields(json!({ "fullName": "" })))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn update_of_unknown_member_is_not_found() {
        let err = directory()
            .update_member(&code("404"), fields(json!({ "level": "x" })))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn bulk_update_reports_each_entry() {
        let dir = directory();
        dir.store
            .set(&RecordPath::pending(&code("1")), json!({ "code": "1", "fullName": "A" }))
            .await
            .unwrap();

        let report = dir
            .bulk_update_pending(vec![
                fields(json!({ "code": "1", "gender": "female" })),
                fields(json!({ "code": "2", "gender": "male" })),
                fields(json!({ "gender": "male" })),
            ])
            .await;

        assert_eq!(report.successful.len(), 1);
        assert_eq!(report.successful[0].code.as_str(), "1");
        assert_eq!(report.failed.len(), 2);
        assert!(report.failed[1].error.contains("code is required"));
    }

    #[tokio::test]
    async fn delete_and_reject_need_an_existing_record() {
        let dir = directory();
        dir.store
            .set(&RecordPath::pending(&code("1")), json!({ "code": "1", "fullName": "A" }))
            .await
            .unwrap();

        dir.reject_pending(&code("1")).await.unwrap();
        assert!(dir.list_pending().await.unwrap().is_empty());
        assert!(dir.reject_pending(&code("1")).await.is_err());
        assert!(dir.delete_member(&code("1")).await.is_err());
    }

    #[tokio::test]
    async fn attendance_report_filters_by_level() {
        let dir = directory();
        dir.store
            .set(
                &RecordPath::member(&code("1")),
                json!({
                    "code": "1",
                    "fullName": "A",
                    "level": "حضانة",
                    "attendance": [{ "status": "تم الحضور" }, { "status": "غائب" }]
                }),
            )
            .await
            .unwrap();
        dir.store
            .set(
                &RecordPath::member(&code("2")),
                json!({ "code": "2", "fullName": "B", "level": "ابتدائي" }),
            )
            .await
            .unwrap();
        dir.store
            .set(&RecordPath::member(&code("3")), json!({ "broken": true }))
            .await
            .unwrap();

        let all = dir.attendance_report(&LevelFilter::All).await.unwrap();
        assert_eq!(all.len(), 2);

        let nursery = dir
            .attendance_report(&LevelFilter::from_query(Some("حضانة")))
            .await
            .unwrap();
        assert_eq!(nursery.len(), 1);
        assert_eq!((nursery[0].total, nursery[0].present, nursery[0].absent), (2, 1, 1));
    }
}
