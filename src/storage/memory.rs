use crate::base::storeerror::StoreError;
use crate::storage::{KeyValueStore, PrefValue, WriteBatch};
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A [`KeyValueStore`] held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, PrefValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with existing entries.
    pub fn with_entries(entries: BTreeMap<String, PrefValue>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    pub fn len(&self) -> usize {
        self.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, PrefValue>>, StoreError> {
        self.entries.read().map_err(|_| StoreError::Storage {
            op: "read",
            message: "memory store lock poisoned".to_string(),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, PrefValue>>, StoreError> {
        self.entries.write().map_err(|_| StoreError::Storage {
            op: "write",
            message: "memory store lock poisoned".to_string(),
        })
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<PrefValue>, StoreError> {
        Ok(self.read()?.get(key).cloned())
    }

    fn all(&self) -> Result<BTreeMap<String, PrefValue>, StoreError> {
        Ok(self.read()?.clone())
    }

    fn apply(&self, batch: WriteBatch) -> Result<(), StoreError> {
        batch.apply_to(&mut *self.write()?);
        Ok(())
    }
}
