//! Ergonomic error context helpers.
//!
//! Provides an extension trait for tagging storage backend failures with the
//! operation that produced them.

use crate::base::storeerror::StoreError;

/// Extension trait for adding context to backend Results.
pub trait StorageResultExt<T> {
    /// Convert a backend error into [`StoreError::Storage`] naming `op`.
    ///
    /// # Example
    /// ```ignore
    /// use cookiestash::base::context::StorageResultExt;
    ///
    /// let tx = conn.transaction().storage_context("begin")?;
    /// // Error: "Storage begin failed: database is locked"
    /// ```
    fn storage_context(self, op: &'static str) -> Result<T, StoreError>;
}

impl<T> StorageResultExt<T> for Result<T, rusqlite::Error> {
    fn storage_context(self, op: &'static str) -> Result<T, StoreError> {
        self.map_err(|e| match StoreError::from(e) {
            StoreError::Storage { message, .. } => StoreError::Storage { op, message },
            other => other,
        })
    }
}

impl<T> StorageResultExt<T> for Result<T, std::io::Error> {
    fn storage_context(self, op: &'static str) -> Result<T, StoreError> {
        self.map_err(|e| StoreError::Storage {
            op,
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_io_context() {
        let result: Result<(), std::io::Error> =
            Err(Error::new(ErrorKind::PermissionDenied, "read-only"));
        let err = result.storage_context("write").unwrap_err();

        match err {
            StoreError::Storage { op, message } => {
                assert_eq!(op, "write");
                assert!(message.contains("read-only"));
            }
            _ => panic!("Expected Storage"),
        }
    }

    #[test]
    fn test_sqlite_context() {
        let result: Result<(), rusqlite::Error> = Err(rusqlite::Error::QueryReturnedNoRows);
        let err = result.storage_context("select").unwrap_err();
        assert!(matches!(err, StoreError::Storage { op: "select", .. }));
    }
}
