//! Pending-member promotion (approval workflow).
//!
//! Moves a record from `pendingMembers` to `members`:
//!
//! ```text
//! approve(code)
//!   ↓
//! 1. read pendingMembers/{code}      (absent → NotFound, or AlreadyPromoted)
//!   ↓
//! 2. read members/{code}             (equal → finish; differs → overwrite or Conflict)
//!   ↓
//! 3. write members/{code}            (full record, verbatim)
//!   ↓
//! 4. delete pendingMembers/{code}
//! ```
//!
//! The store only offers single-key atomicity. Step 3 is acknowledged before
//! step 4 is issued, so a failure can leave the record in both collections
//! but never in neither. Calling `approve` again finishes the move, under
//! either policy: a live record equal to the pending one is not a conflict.
//!
//! The pending record is written by outside clients, so it is moved as an
//! opaque JSON value keyed by the path code and never decoded.

use core::str::FromStr;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use portal_core::MemberCode;

use crate::store::{RecordPath, RecordStore, StoreError};

/// What to do when the live collection already holds the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Last write wins.
    #[default]
    Overwrite,
    Reject,
}

impl FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overwrite" => Ok(Self::Overwrite),
            "reject" => Ok(Self::Reject),
            other => Err(format!("unknown conflict policy '{other}' (expected overwrite or reject)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionStep {
    ReadPending,
    ReadLive,
    WriteLive,
    DeletePending,
}

impl PromotionStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadPending => "read_pending",
            Self::ReadLive => "read_live",
            Self::WriteLive => "write_live",
            Self::DeletePending => "delete_pending",
        }
    }
}

impl core::fmt::Display for PromotionStep {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum PromotionError {
    #[error("no pending member with code {0}")]
    NotFound(MemberCode),

    #[error("member {0} already exists")]
    Conflict(MemberCode),

    #[error("store failure during {step}: {source}")]
    Store {
        step: PromotionStep,
        #[source]
        source: StoreError,
    },
}

impl PromotionError {
    pub fn failed_step(&self) -> Option<PromotionStep> {
        match self {
            Self::Store { step, .. } => Some(*step),
            _ => None,
        }
    }
}

fn at(step: PromotionStep) -> impl FnOnce(StoreError) -> PromotionError {
    move |source| PromotionError::Store { step, source }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionOutcome {
    /// Moved; no live record existed.
    Promoted,
    /// Moved over an existing live record.
    Replaced,
    /// Nothing pending but the live record exists (a repeated approval).
    AlreadyPromoted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Promotion {
    /// The live record, exactly as stored.
    pub member: Value,
    pub outcome: PromotionOutcome,
}

/// The approval workflow over a record store.
#[derive(Debug, Clone)]
pub struct MemberPromotion<S> {
    store: S,
    policy: ConflictPolicy,
}

impl<S> MemberPromotion<S>
where
    S: RecordStore,
{
    pub fn new(store: S, policy: ConflictPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    #[tracing::instrument(skip(self), fields(code = %code, policy = ?self.policy))]
    pub async fn approve(&self, code: &MemberCode) -> Result<Promotion, PromotionError> {
        let pending_path = RecordPath::pending(code);
        let live_path = RecordPath::member(code);

        let pending = self
            .store
            .get(&pending_path)
            .await
            .map_err(at(PromotionStep::ReadPending))?;

        let Some(raw) = pending else {
            return self.already_promoted(code, &live_path).await;
        };

        let existing = self
            .store
            .get(&live_path)
            .await
            .map_err(at(PromotionStep::ReadLive))?;

        let outcome = match (existing, self.policy) {
            (None, _) => PromotionOutcome::Promoted,
            (Some(live), _) if live == raw => {
                tracing::info!("live record already matches pending; finishing the move");
                PromotionOutcome::Replaced
            }
            (Some(_), ConflictPolicy::Reject) => {
                tracing::warn!("live member already exists; approval rejected");
                return Err(PromotionError::Conflict(code.clone()));
            }
            (Some(_), ConflictPolicy::Overwrite) => {
                tracing::warn!("overwriting existing live member");
                PromotionOutcome::Replaced
            }
        };

        self.store
            .set(&live_path, raw.clone())
            .await
            .map_err(at(PromotionStep::WriteLive))?;

        if let Err(source) = self.store.delete(&pending_path).await {
            tracing::error!(
                error = %source,
                "live record written but pending record not removed; retry approve to finish"
            );
            return Err(PromotionError::Store {
                step: PromotionStep::DeletePending,
                source,
            });
        }

        tracing::info!(?outcome, "member approved");
        Ok(Promotion { member: raw, outcome })
    }

    async fn already_promoted(&self, code: &MemberCode, live_path: &RecordPath) -> Result<Promotion, PromotionError> {
        let live = self
            .store
            .get(live_path)
            .await
            .map_err(at(PromotionStep::ReadLive))?;

        match live {
            Some(member) => {
                tracing::info!("member already approved");
                Ok(Promotion {
                    member,
                    outcome: PromotionOutcome::AlreadyPromoted,
                })
            }
            None => Err(PromotionError::NotFound(code.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::{Value, json};

    use portal_core::Fields;

    use super::*;
    use crate::store::{Collection, InMemoryRecordStore};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Op {
        Get,
        Set,
        Delete,
    }

    /// Fails one kind of operation on one collection; counts calls.
    struct FlakyStore {
        inner: InMemoryRecordStore,
        fail: Option<(Op, Collection)>,
        deletes: AtomicUsize,
    }

    impl FlakyStore {
        fn new(fail: Option<(Op, Collection)>) -> Self {
            Self {
                inner: InMemoryRecordStore::new(),
                fail,
                deletes: AtomicUsize::new(0),
            }
        }

        fn check(&self, op: Op, path: &RecordPath) -> Result<(), StoreError> {
            if self.fail == Some((op, path.collection)) {
                return Err(StoreError::Unavailable(format!("{op:?} {path} failed")));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl RecordStore for FlakyStore {
        async fn get(&self, path: &RecordPath) -> Result<Option<Value>, StoreError> {
            self.check(Op::Get, path)?;
            self.inner.get(path).await
        }

        async fn set(&self, path: &RecordPath, value: Value) -> Result<(), StoreError> {
            self.check(Op::Set, path)?;
            self.inner.set(path, value).await
        }

        async fn update(&self, path: &RecordPath, fields: Fields) -> Result<(), StoreError> {
            self.inner.update(path, fields).await
        }

        async fn delete(&self, path: &RecordPath) -> Result<(), StoreError> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            self.check(Op::Delete, path)?;
            self.inner.delete(path).await
        }

        async fn list(&self, collection: Collection) -> Result<BTreeMap<String, Value>, StoreError> {
            self.inner.list(collection).await
        }
    }

    fn code(raw: &str) -> MemberCode {
        MemberCode::parse(raw).unwrap()
    }

    fn jane() -> Value {
        json!({ "code": "20240101", "fullName": "Jane Doe", "level": "حضانة" })
    }

    async fn seeded(fail: Option<(Op, Collection)>) -> FlakyStore {
        let store = FlakyStore::new(fail);
        store
            .inner
            .set(&RecordPath::pending(&code("20240101")), jane())
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn promotes_record_verbatim() {
        let store = seeded(None).await;
        let promotion = MemberPromotion::new(&store, ConflictPolicy::Overwrite);

        let result = promotion.approve(&code("20240101")).await.unwrap();

        assert_eq!(result.outcome, PromotionOutcome::Promoted);
        assert_eq!(result.member, jane());
        assert_eq!(
            store.get(&RecordPath::member(&code("20240101"))).await.unwrap(),
            Some(jane())
        );
        assert!(store
            .get(&RecordPath::pending(&code("20240101")))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn unknown_code_is_not_found_and_changes_nothing() {
        let store = seeded(None).await;
        let promotion = MemberPromotion::new(&store, ConflictPolicy::Overwrite);

        let err = promotion.approve(&code("19990101")).await.unwrap_err();

        assert!(matches!(err, PromotionError::NotFound(_)));
        assert_eq!(store.inner.list(Collection::PendingMembers).await.unwrap().len(), 1);
        assert!(store.inner.list(Collection::Members).await.unwrap().is_empty());
        assert_eq!(store.deletes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn second_approval_is_a_no_op() {
        let store = seeded(None).await;
        let promotion = MemberPromotion::new(&store, ConflictPolicy::Reject);

        promotion.approve(&code("20240101")).await.unwrap();
        let deletes = store.deletes.load(Ordering::SeqCst);
        let again = promotion.approve(&code("20240101")).await.unwrap();

        assert_eq!(again.outcome, PromotionOutcome::AlreadyPromoted);
        assert_eq!(store.deletes.load(Ordering::SeqCst), deletes);
        assert_eq!(
            store.get(&RecordPath::member(&code("20240101"))).await.unwrap(),
            Some(jane())
        );
    }

    #[tokio::test]
    async fn failed_write_prevents_delete() {
        let store = seeded(Some((Op::Set, Collection::Members))).await;
        let promotion = MemberPromotion::new(&store, ConflictPolicy::Overwrite);

        let err = promotion.approve(&code("20240101")).await.unwrap_err();

        assert_eq!(err.failed_step(), Some(PromotionStep::WriteLive));
        assert_eq!(store.deletes.load(Ordering::SeqCst), 0);
        assert_eq!(
            store.get(&RecordPath::pending(&code("20240101"))).await.unwrap(),
            Some(jane())
        );
    }

    #[tokio::test]
    async fn failed_delete_leaves_both_and_retry_recovers() {
        let store = seeded(Some((Op::Delete, Collection::PendingMembers))).await;
        let promotion = MemberPromotion::new(&store, ConflictPolicy::Overwrite);

        let err = promotion.approve(&code("20240101")).await.unwrap_err();
        assert_eq!(err.failed_step(), Some(PromotionStep::DeletePending));
        assert!(store.inner.get(&RecordPath::member(&code("20240101"))).await.unwrap().is_some());
        assert!(store.inner.get(&RecordPath::pending(&code("20240101"))).await.unwrap().is_some());

        // The same data through a healthy store completes the move.
        let healed = MemberPromotion::new(&store.inner, ConflictPolicy::Overwrite);
        let result = healed.approve(&code("20240101")).await.unwrap();
        assert_eq!(result.outcome, PromotionOutcome::Replaced);
        assert!(store.inner.get(&RecordPath::pending(&code("20240101"))).await.unwrap().is_none());
        assert_eq!(
            store.inner.get(&RecordPath::member(&code("20240101"))).await.unwrap(),
            Some(jane())
        );
    }

    #[tokio::test]
    async fn read_failures_report_their_step() {
        let store = seeded(Some((Op::Get, Collection::PendingMembers))).await;
        let err = MemberPromotion::new(&store, ConflictPolicy::Overwrite)
            .approve(&code("20240101"))
            .await
            .unwrap_err();
        assert_eq!(err.failed_step(), Some(PromotionStep::ReadPending));

        let store = seeded(Some((Op::Get, Collection::Members))).await;
        let err = MemberPromotion::new(&store, ConflictPolicy::Overwrite)
            .approve(&code("20240101"))
            .await
            .unwrap_err();
        assert_eq!(err.failed_step(), Some(PromotionStep::ReadLive));
        assert_eq!(store.deletes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reject_policy_keeps_both_records() {
        let store = seeded(None).await;
        let live = json!({ "code": "20240101", "fullName": "Jane Older" });
        store.inner.set(&RecordPath::member(&code("20240101")), live.clone()).await.unwrap();

        let err = MemberPromotion::new(&store, ConflictPolicy::Reject)
            .approve(&code("20240101"))
            .await
            .unwrap_err();

        assert!(matches!(err, PromotionError::Conflict(_)));
        assert_eq!(store.inner.get(&RecordPath::member(&code("20240101"))).await.unwrap(), Some(live));
        assert!(store.inner.get(&RecordPath::pending(&code("20240101"))).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn overwrite_policy_replaces_live_record() {
        let store = seeded(None).await;
        store
            .inner
            .set(
                &RecordPath::member(&code("20240101")),
                json!({ "code": "20240101", "fullName": "Jane Older" }),
            )
            .await
            .unwrap();

        let result = MemberPromotion::new(&store, ConflictPolicy::Overwrite)
            .approve(&code("20240101"))
            .await
            .unwrap();

        assert_eq!(result.outcome, PromotionOutcome::Replaced);
        assert_eq!(store.inner.get(&RecordPath::member(&code("20240101"))).await.unwrap(), Some(jane()));
    }

    #[tokio::test]
    async fn reject_policy_finishes_an_interrupted_move() {
        let store = seeded(None).await;
        store.inner.set(&RecordPath::member(&code("20240101")), jane()).await.unwrap();

        let result = MemberPromotion::new(&store, ConflictPolicy::Reject)
            .approve(&code("20240101"))
            .await
            .unwrap();

        assert_eq!(result.outcome, PromotionOutcome::Replaced);
        assert_eq!(result.member, jane());
        assert!(store.inner.get(&RecordPath::pending(&code("20240101"))).await.unwrap().is_none());
        assert_eq!(store.inner.get(&RecordPath::member(&code("20240101"))).await.unwrap(), Some(jane()));
    }

    #[tokio::test]
    async fn records_without_the_usual_fields_are_still_promoted() {
        let store = FlakyStore::new(None);
        let no_name = json!({ "code": "20240105", "name": "Mina" });
        let numeric_code = json!({ "code": 20240106, "fullName": "Bishoy" });
        store.inner.set(&RecordPath::pending(&code("20240105")), no_name.clone()).await.unwrap();
        store.inner.set(&RecordPath::pending(&code("20240106")), numeric_code.clone()).await.unwrap();
        let promotion = MemberPromotion::new(&store, ConflictPolicy::Overwrite);

        let first = promotion.approve(&code("20240105")).await.unwrap();
        let second = promotion.approve(&code("20240106")).await.unwrap();

        assert_eq!(first.member, no_name);
        assert_eq!(second.member, numeric_code);
        assert!(store.inner.list(Collection::PendingMembers).await.unwrap().is_empty());
        assert_eq!(
            store.inner.get(&RecordPath::member(&code("20240106"))).await.unwrap(),
            Some(numeric_code)
        );
    }

    #[test]
    fn conflict_policy_parses() {
        assert_eq!("overwrite".parse::<ConflictPolicy>(), Ok(ConflictPolicy::Overwrite));
        assert_eq!("Reject".parse::<ConflictPolicy>(), Ok(ConflictPolicy::Reject));
        assert!("merge".parse::<ConflictPolicy>().is_err());
    }
}
