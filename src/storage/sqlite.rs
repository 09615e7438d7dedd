//! SQLite-backed key-value storage.
//!
//! All stores share one table; each store only sees rows of its own
//! namespace, so several stores can live in one database file.

use crate::base::context::StorageResultExt;
use crate::base::storeerror::StoreError;
use crate::storage::{KeyValueStore, PrefValue, ValueKind, WriteBatch, WriteOp};
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS preferences (
    namespace TEXT NOT NULL,
    key TEXT NOT NULL,
    kind INTEGER NOT NULL,
    value,
    PRIMARY KEY (namespace, key)
)";

/// A [`KeyValueStore`] persisted in a SQLite database.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    namespace: String,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: impl AsRef<Path>, namespace: impl Into<String>) -> Result<Self, StoreError> {
        let conn = Connection::open(path).storage_context("open")?;
        Self::from_connection(conn, namespace)
    }

    /// A private in-memory database, gone when the store is dropped.
    pub fn open_in_memory(namespace: impl Into<String>) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().storage_context("open")?;
        Self::from_connection(conn, namespace)
    }

    fn from_connection(conn: Connection, namespace: impl Into<String>) -> Result<Self, StoreError> {
        conn.execute(CREATE_TABLE, [])
            .storage_context("create table")?;
        Ok(Self {
            conn: Mutex::new(conn),
            namespace: namespace.into(),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Storage {
            op: "lock",
            message: "sqlite connection lock poisoned".to_string(),
        })
    }
}

fn to_sql(value: &PrefValue) -> Value {
    match value {
        PrefValue::String(s) => Value::Text(s.clone()),
        PrefValue::Bool(b) => Value::Integer(*b as i64),
        PrefValue::Long(v) => Value::Integer(*v),
        PrefValue::Int(v) => Value::Integer(*v as i64),
        PrefValue::Float(v) => Value::Real(*v as f64),
    }
}

fn from_sql(key: &str, tag: i64, value: Value) -> Result<PrefValue, StoreError> {
    let kind = ValueKind::from_i64(tag).ok_or_else(|| StoreError::Storage {
        op: "decode",
        message: format!("unknown value kind {} for '{}'", tag, key),
    })?;

    let decoded = match (kind, value) {
        (ValueKind::String, Value::Text(s)) => PrefValue::String(s),
        (ValueKind::Bool, Value::Integer(i)) => PrefValue::Bool(i != 0),
        (ValueKind::Long, Value::Integer(i)) => PrefValue::Long(i),
        (ValueKind::Int, Value::Integer(i)) => {
            PrefValue::Int(i32::try_from(i).map_err(|_| StoreError::Storage {
                op: "decode",
                message: format!("'{}' declared Int but holds {}", key, i),
            })?)
        }
        (ValueKind::Float, Value::Real(f)) => PrefValue::Float(f as f32),
        (ValueKind::Float, Value::Integer(i)) => PrefValue::Float(i as f32),
        (kind, other) => {
            return Err(StoreError::Storage {
                op: "decode",
                message: format!("'{}' declared {:?} but holds {:?}", key, kind, other),
            })
        }
    };
    Ok(decoded)
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<PrefValue>, StoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT kind, value FROM preferences WHERE namespace = ?1 AND key = ?2",
                params![self.namespace, key],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Value>(1)?)),
            )
            .optional()
            .storage_context("select")?;

        row.map(|(tag, value)| from_sql(key, tag, value))
            .transpose()
    }

    fn all(&self) -> Result<BTreeMap<String, PrefValue>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT key, kind, value FROM preferences WHERE namespace = ?1")
            .storage_context("prepare")?;
        let rows = stmt
            .query_map(params![self.namespace], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Value>(2)?,
                ))
            })
            .storage_context("select")?;

        let mut entries = BTreeMap::new();
        for row in rows {
            let (key, tag, value) = row.storage_context("select")?;
            let decoded = from_sql(&key, tag, value)?;
            entries.insert(key, decoded);
        }
        Ok(entries)
    }

    fn apply(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction().storage_context("begin")?;

        if batch.is_clear() {
            tx.execute(
                "DELETE FROM preferences WHERE namespace = ?1",
                params![self.namespace],
            )
            .storage_context("clear")?;
        }

        for op in batch.ops() {
            match op {
                WriteOp::Put(key, value) => {
                    tx.execute(
                        "INSERT OR REPLACE INTO preferences (namespace, key, kind, value)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![self.namespace, key, value.kind().as_i64(), to_sql(value)],
                    )
                    .storage_context("insert")?;
                }
                WriteOp::Remove(key) => {
                    tx.execute(
                        "DELETE FROM preferences WHERE namespace = ?1 AND key = ?2",
                        params![self.namespace, key],
                    )
                    .storage_context("delete")?;
                }
            }
        }

        tx.commit().storage_context("commit")
    }
}
