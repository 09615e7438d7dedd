use crate::base::storeerror::StoreError;
use crate::storage::{KeyValueStore, PrefValue, ValueKind, WriteBatch};
use std::sync::{Mutex, MutexGuard};

/// A single typed preference backed by a key-value store.
///
/// The kind is declared up front. The first read goes to storage and is
/// cached; writes go through only when the value actually changes.
///
/// # Example
/// ```
/// use cookiestash::prefs::property::Preference;
/// use cookiestash::storage::{memory::MemoryStore, PrefValue, ValueKind};
///
/// let store = MemoryStore::new();
/// let volume = Preference::new("volume", ValueKind::Int, Some(PrefValue::Int(5))).unwrap();
/// assert_eq!(volume.get(&store).unwrap(), PrefValue::Int(5));
/// volume.set(&store, PrefValue::Int(8)).unwrap();
/// assert_eq!(volume.get(&store).unwrap(), PrefValue::Int(8));
/// ```
#[derive(Debug)]
pub struct Preference {
    key: String,
    kind: ValueKind,
    default: PrefValue,
    cached: Mutex<Option<PrefValue>>,
}

impl Preference {
    /// Declare a preference. A default of another kind is rejected.
    pub fn new(
        key: impl Into<String>,
        kind: ValueKind,
        default: Option<PrefValue>,
    ) -> Result<Self, StoreError> {
        let key = key.into();
        let default = match default {
            Some(value) if value.kind() != kind => {
                return Err(StoreError::type_mismatch(key, kind, value.kind()))
            }
            Some(value) => value,
            None => kind.zero(),
        };

        Ok(Self {
            key,
            kind,
            default,
            cached: Mutex::new(None),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Current value; the default when nothing is stored.
    pub fn get(&self, store: &dyn KeyValueStore) -> Result<PrefValue, StoreError> {
        let mut cached = self.lock()?;
        if let Some(value) = cached.as_ref() {
            return Ok(value.clone());
        }

        let value = match store.get(&self.key)? {
            Some(stored) if stored.kind() != self.kind => {
                return Err(StoreError::type_mismatch(&self.key, self.kind, stored.kind()))
            }
            Some(stored) => stored,
            None => self.default.clone(),
        };
        *cached = Some(value.clone());
        Ok(value)
    }

    /// Store `value` unless it equals the cached value.
    pub fn set(&self, store: &dyn KeyValueStore, value: PrefValue) -> Result<(), StoreError> {
        if value.kind() != self.kind {
            return Err(StoreError::type_mismatch(&self.key, self.kind, value.kind()));
        }

        let mut cached = self.lock()?;
        if cached.as_ref() == Some(&value) {
            return Ok(());
        }

        let mut batch = WriteBatch::new();
        batch.put(&self.key, value.clone());
        store.apply(batch)?;
        *cached = Some(value);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<PrefValue>>, StoreError> {
        self.cached.lock().map_err(|_| StoreError::Storage {
            op: "lock",
            message: format!("preference '{}' lock poisoned", self.key),
        })
    }
}
