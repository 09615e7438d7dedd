//! JSON file storage - the whole map lives in one document on disk.

use crate::base::context::StorageResultExt;
use crate::base::storeerror::StoreError;
use crate::storage::{KeyValueStore, PrefValue, WriteBatch};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tempfile::NamedTempFile;

/// A [`KeyValueStore`] mirrored to a JSON file.
///
/// Entries are read once at open and the file is replaced after every
/// batch: the document is written to a sibling temp file, synced, then
/// renamed over `path`, so a crash leaves either the old or the new file.
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, PrefValue>>,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(json) if json.trim().is_empty() => BTreeMap::new(),
            Ok(json) => serde_json::from_str(&json)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn replace_file(&self, contents: &[u8]) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).storage_context("write")?;
        tmp.write_all(contents).storage_context("write")?;
        tmp.as_file().sync_all().storage_context("sync")?;
        tmp.persist(&self.path)
            .map_err(|e| e.error)
            .storage_context("rename")?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, PrefValue>>, StoreError> {
        self.entries.lock().map_err(|_| StoreError::Storage {
            op: "lock",
            message: "json store lock poisoned".to_string(),
        })
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<PrefValue>, StoreError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn all(&self) -> Result<BTreeMap<String, PrefValue>, StoreError> {
        Ok(self.lock()?.clone())
    }

    fn apply(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut entries = self.lock()?;
        let mut updated = entries.clone();
        batch.apply_to(&mut updated);

        let json = serde_json::to_string_pretty(&updated)?;
        self.replace_file(json.as_bytes())?;

        // Only publish once the file reflects the batch.
        *entries = updated;
        Ok(())
    }
}
