//! Hierarchical record store: keyed JSON records grouped in collections.
//!
//! The store is an external collaborator. Each operation is atomic for a
//! single key; nothing here assumes multi-key transactions.

pub mod in_memory;
pub mod postgres;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use portal_core::{Fields, MemberCode, PortalUid};

pub use in_memory::InMemoryRecordStore;
pub use postgres::PostgresRecordStore;

/// Top-level collections of the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    PortalUsers,
    PendingMembers,
    Members,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::PortalUsers => "portalUsers",
            Collection::PendingMembers => "pendingMembers",
            Collection::Members => "members",
        }
    }
}

impl core::fmt::Display for Collection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `collection/key` address of a single record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordPath {
    pub collection: Collection,
    pub key: String,
}

impl RecordPath {
    pub fn new(collection: Collection, key: impl Into<String>) -> Self {
        Self {
            collection,
            key: key.into(),
        }
    }

    pub fn pending(code: &MemberCode) -> Self {
        Self::new(Collection::PendingMembers, code.as_str())
    }

    pub fn member(code: &MemberCode) -> Self {
        Self::new(Collection::Members, code.as_str())
    }

    pub fn portal_user(uid: &PortalUid) -> Self {
        Self::new(Collection::PortalUsers, uid.as_str())
    }
}

impl core::fmt::Display for RecordPath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.collection, self.key)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("record at {path} is malformed: {message}")]
    Malformed { path: String, message: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn malformed(path: impl ToString, message: impl ToString) -> Self {
        Self::Malformed {
            path: path.to_string(),
            message: message.to_string(),
        }
    }
}

/// Keyed get/set/update/delete over JSON records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// `None` when the key does not exist.
    async fn get(&self, path: &RecordPath) -> Result<Option<Value>, StoreError>;

    /// Replace the whole record.
    async fn set(&self, path: &RecordPath, value: Value) -> Result<(), StoreError>;

    /// Merge top-level fields into the record, creating it if absent.
    async fn update(&self, path: &RecordPath, fields: Fields) -> Result<(), StoreError>;

    /// Remove the record. Removing a missing key succeeds.
    async fn delete(&self, path: &RecordPath) -> Result<(), StoreError>;

    /// All records of a collection, by key.
    async fn list(&self, collection: Collection) -> Result<BTreeMap<String, Value>, StoreError>;
}

#[async_trait]
impl<S> RecordStore for Arc<S>
where
    S: RecordStore + ?Sized,
{
    async fn get(&self, path: &RecordPath) -> Result<Option<Value>, StoreError> {
        (**self).get(path).await
    }

    async fn set(&self, path: &RecordPath, value: Value) -> Result<(), StoreError> {
        (**self).set(path, value).await
    }

    async fn update(&self, path: &RecordPath, fields: Fields) -> Result<(), StoreError> {
        (**self).update(path, fields).await
    }

    async fn delete(&self, path: &RecordPath) -> Result<(), StoreError> {
        (**self).delete(path).await
    }

    async fn list(&self, collection: Collection) -> Result<BTreeMap<String, Value>, StoreError> {
        (**self).list(collection).await
    }
}

#[async_trait]
impl<S> RecordStore for &S
where
    S: RecordStore + ?Sized,
{
    async fn get(&self, path: &RecordPath) -> Result<Option<Value>, StoreError> {
        (**self).get(path).await
    }

    async fn set(&self, path: &RecordPath, value: Value) -> Result<(), StoreError> {
        (**self).set(path, value).await
    }

    async fn update(&self, path: &RecordPath, fields: Fields) -> Result<(), StoreError> {
        (**self).update(path, fields).await
    }

    async fn delete(&self, path: &RecordPath) -> Result<(), StoreError> {
        (**self).delete(path).await
    }

    async fn list(&self, collection: Collection) -> Result<BTreeMap<String, Value>, StoreError> {
        (**self).list(collection).await
    }
}

/// Fetch and decode a typed record.
pub async fn load<T, S>(store: &S, path: &RecordPath) -> Result<Option<T>, StoreError>
where
    T: DeserializeOwned,
    S: RecordStore + ?Sized,
{
    match store.get(path).await? {
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| StoreError::malformed(path, e)),
        None => Ok(None),
    }
}

/// Merge `fields` into `existing` the way [`RecordStore::update`] does.
pub(crate) fn merge_fields(existing: Option<Value>, fields: Fields) -> Value {
    match existing {
        Some(Value::Object(mut current)) => {
            current.extend(fields);
            Value::Object(current)
        }
        _ => Value::Object(fields),
    }
}
