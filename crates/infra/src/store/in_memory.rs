use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use portal_core::Fields;

use super::{Collection, RecordPath, RecordStore, StoreError, merge_fields};

/// In-memory record store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    inner: RwLock<HashMap<(Collection, String), Value>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("in-memory store lock poisoned".to_string())
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get(&self, path: &RecordPath) -> Result<Option<Value>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(&(path.collection, path.key.clone())).cloned())
    }

    async fn set(&self, path: &RecordPath, value: Value) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.insert((path.collection, path.key.clone()), value);
        Ok(())
    }

    async fn update(&self, path: &RecordPath, fields: Fields) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let key = (path.collection, path.key.clone());
        let merged = merge_fields(map.remove(&key), fields);
        map.insert(key, merged);
        Ok(())
    }

    async fn delete(&self, path: &RecordPath) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.remove(&(path.collection, path.key.clone()));
        Ok(())
    }

    async fn list(&self, collection: Collection) -> Result<BTreeMap<String, Value>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map
            .iter()
            .filter(|((c, _), _)| *c == collection)
            .map(|((_, k), v)| (k.clone(), v.clone()))
            .collect())
    }
}
