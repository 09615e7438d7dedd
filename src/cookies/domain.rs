//! Host and path matching rules applied to cookies.
//!
//! Public suffixes come from Mozilla's list via the `psl` crate; a cookie
//! may never be scoped to one (e.g. `com`, `co.uk`, `github.io`).

use psl::{List, Psl};
use std::net::IpAddr;
use url::Url;

/// Whether `domain` is itself a public suffix.
pub fn is_public_suffix(domain: &str) -> bool {
    let lower = domain.to_ascii_lowercase();
    List.suffix(lower.as_bytes())
        .is_some_and(|suffix| suffix.as_bytes() == lower.as_bytes())
}

/// Whether a request to `url_host` may carry a cookie scoped to `domain`.
///
/// Equal names always match. A strict subdomain matches when the byte before
/// the suffix is a dot and the host is a name rather than an IP literal.
pub fn domain_match(url_host: &str, domain: &str) -> bool {
    if url_host.eq_ignore_ascii_case(domain) {
        return true;
    }

    if url_host.len() <= domain.len() || is_ip_literal(url_host) {
        return false;
    }

    let split = url_host.len() - domain.len();
    url_host.as_bytes()[split - 1] == b'.'
        && url_host.is_char_boundary(split)
        && url_host[split..].eq_ignore_ascii_case(domain)
}

/// Whether `url_path` lies under `cookie_path`.
pub fn path_match(url_path: &str, cookie_path: &str) -> bool {
    if url_path == cookie_path {
        return true;
    }

    url_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/') || url_path.as_bytes().get(cookie_path.len()) == Some(&b'/'))
}

/// The directory of the request path, used when `Set-Cookie` omits `Path`.
pub fn default_path(url: &Url) -> String {
    let path = url.path();
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}

fn is_ip_literal(host: &str) -> bool {
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
        .is_ok()
}
