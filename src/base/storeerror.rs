use thiserror::Error;

use crate::storage::ValueKind;

/// Errors produced by the cookie store, its codec and the storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    // Record codec
    #[error("Cookie record could not be decoded: {reason}")]
    Codec { reason: String },
    #[error("Invalid cookie: {reason}")]
    InvalidCookie { reason: String },

    // Preferences
    #[error("Value for '{key}' has kind {found:?}, expected {expected:?}")]
    TypeMismatch {
        key: String,
        expected: ValueKind,
        found: ValueKind,
    },

    // Durable storage
    #[error("Storage {op} failed: {message}")]
    Storage { op: &'static str, message: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn codec(reason: impl Into<String>) -> Self {
        StoreError::Codec {
            reason: reason.into(),
        }
    }

    pub fn invalid_cookie(reason: impl Into<String>) -> Self {
        StoreError::InvalidCookie {
            reason: reason.into(),
        }
    }

    pub fn type_mismatch(key: impl Into<String>, expected: ValueKind, found: ValueKind) -> Self {
        StoreError::TypeMismatch {
            key: key.into(),
            expected,
            found,
        }
    }

    /// Whether the error only concerns a single persisted record.
    ///
    /// Such errors are skipped while scanning storage instead of failing the scan.
    pub fn is_record_corruption(&self) -> bool {
        matches!(
            self,
            StoreError::Codec { .. } | StoreError::InvalidCookie { .. }
        )
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ffi::ErrorCode::DatabaseBusy
                    || e.code == rusqlite::ffi::ErrorCode::DatabaseLocked =>
            {
                StoreError::Storage {
                    op: "sqlite",
                    message: "database is locked".to_string(),
                }
            }
            _ => StoreError::Storage {
                op: "sqlite",
                message: err.to_string(),
            },
        }
    }
}
