use crate::base::storeerror::StoreError;
use crate::cookies::domain;
use url::Url;

/// Latest representable expiry: 9999-12-31T23:59:59.999Z in epoch millis.
///
/// Session cookies carry this value with `persistent == false`.
pub const MAX_DATE: i64 = 253_402_300_799_999;

/// An HTTP cookie as handed over by the HTTP layer.
///
/// Cookies are immutable values. Build them with [`Cookie::builder`] or
/// parse a `Set-Cookie` line with [`Cookie::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cookie {
    name: String,
    value: String,
    expires_at: i64,
    domain: String,
    path: String,
    secure: bool,
    http_only: bool,
    persistent: bool,
    host_only: bool,
}

impl Cookie {
    pub fn builder() -> CookieBuilder {
        CookieBuilder::default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Absolute expiry in epoch millis. [`MAX_DATE`] for session cookies.
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn secure(&self) -> bool {
        self.secure
    }

    pub fn http_only(&self) -> bool {
        self.http_only
    }

    /// False for session cookies, which are never written to durable storage.
    pub fn persistent(&self) -> bool {
        self.persistent
    }

    pub fn host_only(&self) -> bool {
        self.host_only
    }

    /// The `domain#name` key that identifies this cookie within a host bucket.
    pub fn identity(&self) -> String {
        format!("{}#{}", self.domain, self.name)
    }

    pub fn is_expired(&self, now_millis: i64) -> bool {
        self.expires_at < now_millis
    }

    /// Whether this cookie should be sent with a request to `url`.
    pub fn matches(&self, url: &Url) -> bool {
        let host = url.host_str().unwrap_or("");
        let domain_ok = if self.host_only {
            host.eq_ignore_ascii_case(&self.domain)
        } else {
            domain::domain_match(host, &self.domain)
        };

        domain_ok
            && domain::path_match(url.path(), &self.path)
            && (!self.secure || url.scheme() == "https")
    }

    /// `name=value`, as it appears in a request `Cookie` header.
    pub fn header_pair(&self) -> String {
        format!("{}={}", self.name, self.value)
    }

    /// Parse one `Set-Cookie` header value received from `url`.
    ///
    /// Returns `None` when the line is malformed or when its `Domain`
    /// attribute does not cover the URL host or is a public suffix.
    pub fn parse(url: &Url, set_cookie: &str, now_millis: i64) -> Option<Cookie> {
        let parsed = match ::cookie::Cookie::parse(set_cookie) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "rejecting malformed Set-Cookie");
                return None;
            }
        };
        let host = url.host_str()?.to_ascii_lowercase();

        let mut builder = Cookie::builder()
            .name(parsed.name())
            .value(parsed.value());

        // Max-Age wins over Expires; neither means a session cookie.
        if let Some(max_age) = parsed.max_age() {
            let seconds = max_age.whole_seconds();
            let expires_at = if seconds <= 0 {
                i64::MIN
            } else {
                now_millis.saturating_add(seconds.saturating_mul(1000))
            };
            builder = builder.expires_at(expires_at);
        } else if let Some(expires) = parsed.expires().and_then(|e| e.datetime()) {
            let millis = (expires.unix_timestamp_nanos() / 1_000_000)
                .clamp(i64::MIN as i128, i64::MAX as i128) as i64;
            builder = builder.expires_at(millis);
        }

        builder = match parsed.domain() {
            Some(d) if !d.trim_start_matches('.').is_empty() => {
                let d = d.trim_start_matches('.').to_ascii_lowercase();
                if !domain::domain_match(&host, &d) || domain::is_public_suffix(&d) {
                    tracing::warn!(url = %url, domain = %d, "rejecting Set-Cookie for foreign domain");
                    return None;
                }
                builder.domain(d)
            }
            _ => builder.host_only_domain(host),
        };

        let path = match parsed.path() {
            Some(p) if p.starts_with('/') => p.to_string(),
            _ => domain::default_path(url),
        };
        builder = builder.path(path);

        if parsed.secure().unwrap_or(false) {
            builder = builder.secure();
        }
        if parsed.http_only().unwrap_or(false) {
            builder = builder.http_only();
        }

        match builder.build() {
            Ok(cookie) => Some(cookie),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "rejecting Set-Cookie");
                None
            }
        }
    }
}

/// Builder for [`Cookie`]. `name`, `value` and a domain are required.
#[derive(Debug, Clone)]
pub struct CookieBuilder {
    name: Option<String>,
    value: Option<String>,
    expires_at: i64,
    domain: Option<String>,
    path: String,
    secure: bool,
    http_only: bool,
    persistent: bool,
    host_only: bool,
}

impl Default for CookieBuilder {
    fn default() -> Self {
        Self {
            name: None,
            value: None,
            expires_at: MAX_DATE,
            domain: None,
            path: "/".to_string(),
            secure: false,
            http_only: false,
            persistent: false,
            host_only: false,
        }
    }
}

impl CookieBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Set an absolute expiry and mark the cookie persistent.
    ///
    /// Non-positive values mean "already expired"; values past [`MAX_DATE`]
    /// are capped.
    pub fn expires_at(mut self, expires_at: i64) -> Self {
        self.expires_at = if expires_at <= 0 {
            i64::MIN
        } else {
            expires_at.min(MAX_DATE)
        };
        self.persistent = true;
        self
    }

    /// Scope the cookie to `domain` and all of its subdomains.
    pub fn domain(self, domain: impl Into<String>) -> Self {
        self.set_domain(domain.into(), false)
    }

    /// Scope the cookie to exactly `domain`.
    pub fn host_only_domain(self, domain: impl Into<String>) -> Self {
        self.set_domain(domain.into(), true)
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    pub fn http_only(mut self) -> Self {
        self.http_only = true;
        self
    }

    fn set_domain(mut self, domain: String, host_only: bool) -> Self {
        self.domain = Some(domain.trim_start_matches('.').to_ascii_lowercase());
        self.host_only = host_only;
        self
    }

    pub fn build(self) -> Result<Cookie, StoreError> {
        let name = self
            .name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| StoreError::invalid_cookie("name is required"))?;
        let value = self
            .value
            .ok_or_else(|| StoreError::invalid_cookie("value is required"))?;
        let domain = self
            .domain
            .filter(|d| !d.is_empty())
            .ok_or_else(|| StoreError::invalid_cookie("domain is required"))?;
        // Identities are stored comma-joined per host.
        if name.contains(',') || domain.contains(',') {
            return Err(StoreError::invalid_cookie(format!(
                "',' not allowed in name or domain: {}#{}",
                domain, name
            )));
        }
        if !self.path.starts_with('/') {
            return Err(StoreError::invalid_cookie(format!(
                "path must start with '/': {}",
                self.path
            )));
        }

        Ok(Cookie {
            name,
            value,
            expires_at: self.expires_at,
            domain,
            path: self.path,
            secure: self.secure,
            http_only: self.http_only,
            persistent: self.persistent,
            host_only: self.host_only,
        })
    }
}
