//! Cookie persistence for an HTTP client.
//!
//! | Type | Responsibility |
//! |------|----------------|
//! | [`Cookie`](cookie::Cookie) | immutable cookie value, `Set-Cookie` parsing |
//! | [`codec`] | fixed nine-field record, stored as lowercase hex |
//! | [`PersistentCookieStore`](store::PersistentCookieStore) | host-partitioned index with write-through storage |
//! | [`TokenCookieJar`](jar::TokenCookieJar) | [`CookieJar`](jar::CookieJar) hooks over the store |
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use cookiestash::cookies::jar::{CookieJar, TokenCookieJar};
//! use cookiestash::cookies::store::PersistentCookieStore;
//! use cookiestash::storage::memory::MemoryStore;
//! use url::Url;
//!
//! let store = PersistentCookieStore::new(Arc::new(MemoryStore::new()))?;
//! let jar = TokenCookieJar::new(Arc::new(store));
//!
//! let url = Url::parse("https://example.com/").unwrap();
//! assert!(jar.load_for_request(&url).is_empty());
//! # Ok::<(), cookiestash::base::storeerror::StoreError>(())
//! ```

pub mod codec;
pub mod cookie;
pub mod domain;
pub mod jar;
pub mod store;
