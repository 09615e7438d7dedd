//! Durable, host-partitioned cookie store.
//!
//! Cookies are indexed per request host and written through to a
//! [`KeyValueStore`] using two kinds of keys:
//!
//! | Key | Value |
//! |-----|-------|
//! | `host_<hostname>` | comma-joined identities (`domain#name`) of the bucket |
//! | `cookie_<domain>#<name>` | hex record from [`codec`](crate::cookies::codec) |
//!
//! Expired cookies are purged from memory and storage once, when the store
//! is built. Afterwards `load` only filters them out of its result; they
//! stay indexed until removed, cleared, or swept by the next construction.

use crate::base::clock::{Clock, SystemClock};
use crate::base::storeerror::StoreError;
use crate::cookies::codec::{decode_cookie, encode_cookie};
use crate::cookies::cookie::Cookie;
use crate::storage::sqlite::SqliteStore;
use crate::storage::{KeyValueStore, PrefValue, WriteBatch};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard};

/// Default storage namespace for cookies.
pub const COOKIE_PREFS: &str = "cookie_prefs";
/// Prefix of the keys listing a host bucket's identities.
pub const PREFIX_HOST_NAME: &str = "host_";
/// Prefix of the keys holding one encoded cookie.
pub const PREFIX_COOKIE_NAME: &str = "cookie_";

fn host_key(host: &str) -> String {
    format!("{}{}", PREFIX_HOST_NAME, host)
}

fn cookie_key(identity: &str) -> String {
    format!("{}{}", PREFIX_COOKIE_NAME, identity)
}

fn gate_poisoned() -> StoreError {
    StoreError::Storage {
        op: "lock",
        message: "cookie store clear gate poisoned".to_string(),
    }
}

/// Cookies stored for one request host.
#[derive(Default)]
struct HostBucket {
    cookies: DashMap<String, Cookie>,
    // Held while a change is applied to `cookies` and written through.
    write_lock: Mutex<()>,
}

impl HostBucket {
    fn lock(&self) -> Result<MutexGuard<'_, ()>, StoreError> {
        self.write_lock.lock().map_err(|_| StoreError::Storage {
            op: "lock",
            message: "host bucket lock poisoned".to_string(),
        })
    }

    /// Sorted, comma-joined identities.
    fn identity_list(&self) -> String {
        let mut ids: Vec<String> = self.cookies.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids.join(",")
    }

    /// Queue the write that brings the persisted identity list in line.
    fn persist_identity_list(&self, host_key: &str, batch: &mut WriteBatch) {
        if self.cookies.is_empty() {
            batch.remove(host_key);
        } else {
            batch.put_string(host_key, self.identity_list());
        }
    }
}

/// Cookie store backed by durable key-value storage.
///
/// Shared between concurrent requests through `Arc`. Reads never wait on
/// writers; writers to one host are serialized so the persisted identity
/// list always matches the bucket it was computed from.
pub struct PersistentCookieStore {
    index: DashMap<String, Arc<HostBucket>>,
    // Shared by writers, exclusive for `clear`, so no write lands mid-clear.
    clear_gate: RwLock<()>,
    storage: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for PersistentCookieStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentCookieStore")
            .field("hosts", &self.index.len())
            .field("cookies", &self.total_cookie_count())
            .finish()
    }
}

impl PersistentCookieStore {
    /// Load the store from `storage` using the system clock.
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Result<Self, StoreError> {
        Self::builder().build(storage)
    }

    pub fn builder() -> PersistentCookieStoreBuilder {
        PersistentCookieStoreBuilder::default()
    }

    /// Open the SQLite database at `path` under the [`COOKIE_PREFS`] namespace.
    pub fn open_sqlite(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage = SqliteStore::open(path, COOKIE_PREFS)?;
        Self::new(Arc::new(storage))
    }

    fn load_from_storage(
        storage: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StoreError> {
        let store = Self {
            index: DashMap::new(),
            clear_gate: RwLock::new(()),
            storage,
            clock,
        };

        let local = store.storage.all()?;
        let mut loaded = 0usize;
        for (key, value) in &local {
            if !key.starts_with(PREFIX_HOST_NAME) {
                continue;
            }
            let Some(ids) = value.as_str().filter(|v| !v.is_empty()) else {
                continue;
            };

            let bucket = store.index.entry(key.clone()).or_default().clone();
            for id in ids.split(',').filter(|id| !id.is_empty()) {
                if let Some(cookie) = Self::decode_record(&local, id) {
                    bucket.cookies.insert(id.to_string(), cookie);
                    loaded += 1;
                }
            }
        }

        let swept = store.clear_expired()?;
        tracing::debug!(
            hosts = store.index.len(),
            loaded,
            swept,
            "cookie store loaded"
        );
        Ok(store)
    }

    fn decode_record(local: &BTreeMap<String, PrefValue>, id: &str) -> Option<Cookie> {
        let key = cookie_key(id);
        let Some(encoded) = local.get(&key).and_then(PrefValue::as_str) else {
            tracing::warn!(key = %key, "listed cookie record is missing");
            return None;
        };

        match decode_cookie(encoded) {
            Ok(cookie) => Some(cookie),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "skipping unreadable cookie record");
                None
            }
        }
    }

    /// Drop expired cookies from memory and storage. Returns how many went.
    fn clear_expired(&self) -> Result<usize, StoreError> {
        let now = self.clock.now_millis();
        let mut batch = WriteBatch::new();
        let mut swept = 0;

        for entry in self.index.iter() {
            let (key, bucket) = (entry.key(), entry.value());
            let expired: Vec<String> = bucket
                .cookies
                .iter()
                .filter(|c| c.value().is_expired(now))
                .map(|c| c.key().clone())
                .collect();
            if expired.is_empty() {
                continue;
            }

            for id in &expired {
                bucket.cookies.remove(id);
                batch.remove(cookie_key(id));
            }
            bucket.persist_identity_list(key, &mut batch);
            swept += expired.len();
        }
        self.index.retain(|_, bucket| !bucket.cookies.is_empty());

        if !batch.is_empty() {
            self.storage.apply(batch)?;
        }
        Ok(swept)
    }

    /// Remember the persistent, unexpired cookies among `cookies` for `host`.
    ///
    /// Session cookies are dropped. Each kept cookie replaces any earlier
    /// cookie with the same domain and name, and is written through before
    /// this returns.
    pub fn save(
        &self,
        host: &str,
        cookies: impl IntoIterator<Item = Cookie>,
    ) -> Result<(), StoreError> {
        let _gate = self.writer_gate()?;
        let now = self.clock.now_millis();
        for cookie in cookies.into_iter().filter(|c| !c.is_expired(now)) {
            if !cookie.persistent() {
                tracing::debug!(host, name = cookie.name(), "not persisting session cookie");
                continue;
            }
            self.add_cookie(host, cookie)?;
        }
        Ok(())
    }

    fn add_cookie(&self, host: &str, cookie: Cookie) -> Result<(), StoreError> {
        let http_host = host_key(host);
        let bucket = self.index.entry(http_host.clone()).or_default().clone();
        let _guard = bucket.lock()?;

        let id = cookie.identity();
        let encoded = encode_cookie(&cookie);
        let previous = bucket.cookies.insert(id.clone(), cookie);

        // List first: a listed but missing record reads as absent later.
        let mut batch = WriteBatch::new();
        batch.put_string(&http_host, bucket.identity_list());
        batch.put_string(cookie_key(&id), encoded);
        if let Err(e) = self.storage.apply(batch) {
            match previous {
                Some(previous) => {
                    bucket.cookies.insert(id, previous);
                }
                None => {
                    bucket.cookies.remove(&id);
                }
            }
            return Err(e);
        }
        Ok(())
    }

    /// Unexpired cookies stored for `host`.
    ///
    /// Expired cookies are filtered out but not evicted.
    pub fn load(&self, host: &str) -> Vec<Cookie> {
        self.index
            .get(&host_key(host))
            .map(|bucket| self.live_cookies(&bucket))
            .unwrap_or_default()
    }

    fn live_cookies(&self, bucket: &HostBucket) -> Vec<Cookie> {
        let now = self.clock.now_millis();
        let mut cookies: Vec<Cookie> = bucket
            .cookies
            .iter()
            .filter(|c| !c.value().is_expired(now))
            .map(|c| c.value().clone())
            .collect();
        cookies.sort_by(|a, b| a.domain().cmp(b.domain()).then_with(|| a.name().cmp(b.name())));
        cookies
    }

    /// Forget `cookie` for `host`. Returns whether it was stored.
    pub fn remove(&self, host: &str, cookie: &Cookie) -> Result<bool, StoreError> {
        let _gate = self.writer_gate()?;
        let http_host = host_key(host);
        let Some(bucket) = self.index.get(&http_host).map(|b| b.clone()) else {
            return Ok(false);
        };
        let _guard = bucket.lock()?;

        let id = cookie.identity();
        let Some((_, removed)) = bucket.cookies.remove(&id) else {
            return Ok(false);
        };

        // Record first: an unlisted record would never be cleaned up.
        let mut batch = WriteBatch::new();
        batch.remove(cookie_key(&id));
        bucket.persist_identity_list(&http_host, &mut batch);
        if let Err(e) = self.storage.apply(batch) {
            bucket.cookies.insert(id, removed);
            return Err(e);
        }
        Ok(true)
    }

    /// Wipe every stored cookie, in memory and on disk.
    ///
    /// Waits for in-flight `save` and `remove` calls to finish first.
    pub fn clear(&self) -> Result<(), StoreError> {
        let _gate = self.clear_gate.write().map_err(|_| gate_poisoned())?;
        let mut batch = WriteBatch::new();
        batch.clear();
        self.storage.apply(batch)?;
        self.index.clear();
        Ok(())
    }

    fn writer_gate(&self) -> Result<RwLockReadGuard<'_, ()>, StoreError> {
        self.clear_gate.read().map_err(|_| gate_poisoned())
    }

    /// Unexpired cookies of every host.
    pub fn cookies(&self) -> Vec<Cookie> {
        self.index
            .iter()
            .flat_map(|entry| self.live_cookies(entry.value()))
            .collect()
    }

    /// Hosts that currently have stored cookies, sorted.
    pub fn hosts(&self) -> Vec<String> {
        let mut hosts: Vec<String> = self
            .index
            .iter()
            .filter(|entry| !entry.value().cookies.is_empty())
            .filter_map(|entry| entry.key().strip_prefix(PREFIX_HOST_NAME).map(str::to_string))
            .collect();
        hosts.sort();
        hosts
    }

    /// Indexed cookies, expired ones included.
    pub fn total_cookie_count(&self) -> usize {
        self.index.iter().map(|e| e.value().cookies.len()).sum()
    }
}

/// Builder for [`PersistentCookieStore`].
#[derive(Default)]
pub struct PersistentCookieStoreBuilder {
    clock: Option<Arc<dyn Clock>>,
}

impl PersistentCookieStoreBuilder {
    /// Time source for expiry checks. Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Load every cookie from `storage` and sweep the expired ones.
    pub fn build(self, storage: Arc<dyn KeyValueStore>) -> Result<PersistentCookieStore, StoreError> {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        PersistentCookieStore::load_from_storage(storage, clock)
    }
}
