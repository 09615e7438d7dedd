//! Persisted cookie record format.
//!
//! A record holds exactly nine fields and is stored as lowercase hex text:
//!
//! | Field | Encoding |
//! |-------|----------|
//! | version | `u8`, currently `1` |
//! | name, value, domain, path | big-endian `u32` length, then UTF-8 bytes |
//! | expires_at | big-endian `i64` epoch millis |
//! | flags | `u8`: bit0 secure, bit1 http_only, bit2 persistent, bit3 host_only |
//!
//! Unknown flag bits and trailing bytes are rejected.

use crate::base::storeerror::StoreError;
use crate::cookies::cookie::Cookie;
use crate::util::bytes;

const RECORD_VERSION: u8 = 1;

const FLAG_SECURE: u8 = 1 << 0;
const FLAG_HTTP_ONLY: u8 = 1 << 1;
const FLAG_PERSISTENT: u8 = 1 << 2;
const FLAG_HOST_ONLY: u8 = 1 << 3;
const KNOWN_FLAGS: u8 = FLAG_SECURE | FLAG_HTTP_ONLY | FLAG_PERSISTENT | FLAG_HOST_ONLY;

/// The nine persisted fields, independent of how [`Cookie`] is laid out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    pub expires_at: i64,
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    pub persistent: bool,
    pub host_only: bool,
}

impl From<&Cookie> for CookieRecord {
    fn from(cookie: &Cookie) -> Self {
        Self {
            name: cookie.name().to_string(),
            value: cookie.value().to_string(),
            expires_at: cookie.expires_at(),
            domain: cookie.domain().to_string(),
            path: cookie.path().to_string(),
            secure: cookie.secure(),
            http_only: cookie.http_only(),
            persistent: cookie.persistent(),
            host_only: cookie.host_only(),
        }
    }
}

impl CookieRecord {
    /// Rebuild a cookie from the record.
    ///
    /// Session records come back as session cookies; every other record
    /// carries its stored expiry.
    pub fn to_cookie(&self) -> Result<Cookie, StoreError> {
        let mut builder = Cookie::builder()
            .name(&self.name)
            .value(&self.value)
            .path(&self.path);
        if self.persistent {
            builder = builder.expires_at(self.expires_at);
        }
        builder = if self.host_only {
            builder.host_only_domain(&self.domain)
        } else {
            builder.domain(&self.domain)
        };
        if self.secure {
            builder = builder.secure();
        }
        if self.http_only {
            builder = builder.http_only();
        }
        builder.build()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            1 + 16 + 8 + 1 + self.name.len() + self.value.len() + self.domain.len() + self.path.len(),
        );
        out.push(RECORD_VERSION);
        for field in [&self.name, &self.value, &self.domain, &self.path] {
            out.extend_from_slice(&(field.len() as u32).to_be_bytes());
            out.extend_from_slice(field.as_bytes());
        }
        out.extend_from_slice(&self.expires_at.to_be_bytes());

        let mut flags = 0u8;
        if self.secure {
            flags |= FLAG_SECURE;
        }
        if self.http_only {
            flags |= FLAG_HTTP_ONLY;
        }
        if self.persistent {
            flags |= FLAG_PERSISTENT;
        }
        if self.host_only {
            flags |= FLAG_HOST_ONLY;
        }
        out.push(flags);
        out
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, StoreError> {
        let mut reader = Reader { data, pos: 0 };

        let version = reader.take(1)?[0];
        if version != RECORD_VERSION {
            return Err(StoreError::codec(format!(
                "unsupported record version {}",
                version
            )));
        }

        let name = reader.string()?;
        let value = reader.string()?;
        let domain = reader.string()?;
        let path = reader.string()?;

        let mut expires = [0u8; 8];
        expires.copy_from_slice(reader.take(8)?);
        let expires_at = i64::from_be_bytes(expires);

        let flags = reader.take(1)?[0];
        if flags & !KNOWN_FLAGS != 0 {
            return Err(StoreError::codec(format!("unknown flag bits {:#04x}", flags)));
        }
        if reader.pos != data.len() {
            return Err(StoreError::codec(format!(
                "{} trailing bytes",
                data.len() - reader.pos
            )));
        }

        Ok(Self {
            name,
            value,
            expires_at,
            domain,
            path,
            secure: flags & FLAG_SECURE != 0,
            http_only: flags & FLAG_HTTP_ONLY != 0,
            persistent: flags & FLAG_PERSISTENT != 0,
            host_only: flags & FLAG_HOST_ONLY != 0,
        })
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], StoreError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| {
                StoreError::codec(format!(
                    "record truncated at byte {} (wanted {} more)",
                    self.pos, n
                ))
            })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn string(&mut self) -> Result<String, StoreError> {
        let len = bytes::to_uint(self.take(4)?) as u32 as usize;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec())
            .map_err(|e| StoreError::codec(format!("field is not UTF-8: {}", e)))
    }
}

/// Serialize a cookie into its hex record text.
pub fn encode_cookie(cookie: &Cookie) -> String {
    hex::encode(&CookieRecord::from(cookie).to_bytes())
}

/// Parse hex record text back into a cookie.
pub fn decode_cookie(encoded: &str) -> Result<Cookie, StoreError> {
    let data = hex::decode(encoded).map_err(|e| StoreError::codec(format!("bad hex: {}", e)))?;
    CookieRecord::from_bytes(&data)?.to_cookie()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Cookie {
        Cookie::builder()
            .name("session")
            .value("a=b; c")
            .domain("example.com")
            .path("/app")
            .expires_at(1_800_000_000_000)
            .secure()
            .http_only()
            .build()
            .unwrap()
    }

    #[test]
    fn test_roundtrip_keeps_all_fields() {
        let cookie = sample();
        let decoded = decode_cookie(&encode_cookie(&cookie)).unwrap();
        assert_eq!(CookieRecord::from(&decoded), CookieRecord::from(&cookie));
        assert_eq!(decoded, cookie);
    }

    #[test]
    fn test_roundtrip_host_only_session_cookie() {
        let cookie = Cookie::builder()
            .name("tmp")
            .value("")
            .host_only_domain("api.example.com")
            .build()
            .unwrap();
        let decoded = decode_cookie(&encode_cookie(&cookie)).unwrap();
        assert_eq!(decoded, cookie);
        assert!(decoded.host_only());
        assert!(!decoded.persistent());
    }

    #[test]
    fn test_encoding_is_lowercase_hex() {
        let encoded = encode_cookie(&sample());
        assert!(encoded.starts_with("01"));
        assert!(encoded
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_layout() {
        let cookie = Cookie::builder()
            .name("n")
            .value("v")
            .host_only_domain("d")
            .path("/")
            .expires_at(1)
            .build()
            .unwrap();
        let bytes = CookieRecord::from(&cookie).to_bytes();
        assert_eq!(
            bytes,
            vec![
                1, // version
                0, 0, 0, 1, b'n', //
                0, 0, 0, 1, b'v', //
                0, 0, 0, 1, b'd', //
                0, 0, 0, 1, b'/', //
                0, 0, 0, 0, 0, 0, 0, 1, // expires_at
                FLAG_PERSISTENT | FLAG_HOST_ONLY,
            ]
        );
    }

    #[test]
    fn test_rejects_corruption() {
        let good = CookieRecord::from(&sample()).to_bytes();

        let mut truncated = good.clone();
        truncated.pop();
        assert!(CookieRecord::from_bytes(&truncated).is_err());

        let mut trailing = good.clone();
        trailing.push(0);
        assert!(CookieRecord::from_bytes(&trailing).is_err());

        let mut bad_version = good.clone();
        bad_version[0] = 2;
        assert!(CookieRecord::from_bytes(&bad_version).is_err());

        let mut bad_flags = good;
        *bad_flags.last_mut().unwrap() |= 0x80;
        assert!(CookieRecord::from_bytes(&bad_flags).is_err());

        assert!(decode_cookie("").is_err());
    }

    #[test]
    fn test_bad_hex_is_codec_error() {
        for text in ["not hex", "abc", "zz"] {
            let err = decode_cookie(text).unwrap_err();
            assert!(matches!(err, StoreError::Codec { .. }), "{}: {:?}", text, err);
        }
        // Upper case digits are accepted.
        let upper = encode_cookie(&sample()).to_uppercase();
        assert_eq!(decode_cookie(&upper).unwrap(), sample());
    }

    #[test]
    fn test_huge_length_prefix_is_truncation_not_panic() {
        let data = [1u8, 0xff, 0xff, 0xff, 0xff];
        let err = CookieRecord::from_bytes(&data).unwrap_err();
        assert!(err.is_record_corruption());
    }
}
