//! Cookie-jar contract between an HTTP client and cookie storage.

use crate::base::clock::{Clock, SystemClock};
use crate::base::storeerror::StoreError;
use crate::cookies::cookie::Cookie;
use crate::cookies::store::PersistentCookieStore;
use http::header::SET_COOKIE;
use http::HeaderMap;
use std::sync::Arc;
use url::Url;

/// Hooks an HTTP client calls around every request/response cycle.
pub trait CookieJar: Send + Sync {
    /// Remember cookies received in the response to `url`.
    fn save_from_response(&self, url: &Url, cookies: Vec<Cookie>) -> Result<(), StoreError>;

    /// Cookies to attach to a request for `url`.
    fn load_for_request(&self, url: &Url) -> Vec<Cookie>;
}

/// [`CookieJar`] over a [`PersistentCookieStore`], keyed on the URL host.
#[derive(Clone)]
pub struct TokenCookieJar {
    store: Arc<PersistentCookieStore>,
    clock: Arc<dyn Clock>,
}

impl TokenCookieJar {
    pub fn new(store: Arc<PersistentCookieStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
        }
    }

    /// Use `clock` to resolve `Max-Age` when parsing `Set-Cookie` headers.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<PersistentCookieStore> {
        &self.store
    }

    /// Parse every `Set-Cookie` header in `headers` and save the result.
    ///
    /// Lines that fail to parse are skipped. Returns how many cookies were
    /// handed to the store.
    pub fn save_set_cookie_headers(&self, url: &Url, headers: &HeaderMap) -> Result<usize, StoreError> {
        let now = self.clock.now_millis();
        let cookies: Vec<Cookie> = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|line| Cookie::parse(url, line, now))
            .collect();

        let count = cookies.len();
        self.save_from_response(url, cookies)?;
        Ok(count)
    }

    /// Value for the request `Cookie` header, if any cookie applies to `url`.
    pub fn cookie_header(&self, url: &Url) -> Option<String> {
        let pairs: Vec<String> = self
            .load_for_request(url)
            .iter()
            .filter(|c| c.matches(url))
            .map(Cookie::header_pair)
            .collect();

        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }
}

impl CookieJar for TokenCookieJar {
    fn save_from_response(&self, url: &Url, cookies: Vec<Cookie>) -> Result<(), StoreError> {
        match url.host_str() {
            Some(host) => self.store.save(host, cookies),
            None => Ok(()),
        }
    }

    fn load_for_request(&self, url: &Url) -> Vec<Cookie> {
        url.host_str()
            .map(|host| self.store.load(host))
            .unwrap_or_default()
    }
}
