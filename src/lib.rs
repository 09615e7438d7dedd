//! # cookiestash
//!
//! A persistent cookie store for HTTP clients.
//!
//! Cookies received from a server are indexed per request host and written
//! through to durable key-value storage, so they survive restarts. Expired
//! cookies are swept when the store is loaded and never returned by lookups.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cookiestash::cookies::jar::TokenCookieJar;
//! use cookiestash::cookies::store::PersistentCookieStore;
//! use url::Url;
//!
//! let store = PersistentCookieStore::open_sqlite("cookies.db")?;
//! let jar = TokenCookieJar::new(Arc::new(store));
//!
//! let url = Url::parse("https://example.com/").unwrap();
//! if let Some(header) = jar.cookie_header(&url) {
//!     println!("Cookie: {}", header);
//! }
//! # Ok::<(), cookiestash::base::storeerror::StoreError>(())
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Errors and the clock used for expiry
//! - [`cookies`] - Cookie value, record codec, store and jar
//! - [`storage`] - Key-value storage backends (memory, SQLite, JSON file)
//! - [`prefs`] - Typed preferences over the same storage
//! - [`util`] - Byte helpers

pub mod base;
pub mod cookies;
pub mod prefs;
pub mod storage;
pub mod util;
