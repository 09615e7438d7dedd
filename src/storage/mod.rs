//! Durable flat key-value storage.
//!
//! The cookie store and [`Preference`](crate::prefs::property::Preference)
//! write through a [`KeyValueStore`]: a string-keyed map of primitive values,
//! edited in ordered batches.
//!
//! | Backend | Durability |
//! |---------|------------|
//! | [`MemoryStore`](memory::MemoryStore) | process lifetime |
//! | [`SqliteStore`](sqlite::SqliteStore) | one namespace of a SQLite database |
//! | [`JsonFileStore`](jsonfile::JsonFileStore) | a JSON document rewritten on every batch |

pub mod jsonfile;
pub mod memory;
pub mod sqlite;

use crate::base::storeerror::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The primitive kinds a store can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    String,
    Bool,
    Long,
    Int,
    Float,
}

impl ValueKind {
    /// Value returned when a key is absent and no default was given.
    pub fn zero(self) -> PrefValue {
        match self {
            ValueKind::String => PrefValue::String(String::new()),
            ValueKind::Bool => PrefValue::Bool(false),
            ValueKind::Long => PrefValue::Long(0),
            ValueKind::Int => PrefValue::Int(0),
            ValueKind::Float => PrefValue::Float(0.0),
        }
    }

    pub(crate) fn as_i64(self) -> i64 {
        match self {
            ValueKind::String => 0,
            ValueKind::Bool => 1,
            ValueKind::Long => 2,
            ValueKind::Int => 3,
            ValueKind::Float => 4,
        }
    }

    pub(crate) fn from_i64(tag: i64) -> Option<Self> {
        match tag {
            0 => Some(ValueKind::String),
            1 => Some(ValueKind::Bool),
            2 => Some(ValueKind::Long),
            3 => Some(ValueKind::Int),
            4 => Some(ValueKind::Float),
            _ => None,
        }
    }
}

/// A stored value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum PrefValue {
    String(String),
    Bool(bool),
    Long(i64),
    Int(i32),
    Float(f32),
}

impl PrefValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            PrefValue::String(_) => ValueKind::String,
            PrefValue::Bool(_) => ValueKind::Bool,
            PrefValue::Long(_) => ValueKind::Long,
            PrefValue::Int(_) => ValueKind::Int,
            PrefValue::Float(_) => ValueKind::Float,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PrefValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for PrefValue {
    fn from(v: &str) -> Self {
        PrefValue::String(v.to_string())
    }
}

impl From<String> for PrefValue {
    fn from(v: String) -> Self {
        PrefValue::String(v)
    }
}

impl From<bool> for PrefValue {
    fn from(v: bool) -> Self {
        PrefValue::Bool(v)
    }
}

impl From<i64> for PrefValue {
    fn from(v: i64) -> Self {
        PrefValue::Long(v)
    }
}

impl From<i32> for PrefValue {
    fn from(v: i32) -> Self {
        PrefValue::Int(v)
    }
}

impl From<f32> for PrefValue {
    fn from(v: f32) -> Self {
        PrefValue::Float(v)
    }
}

/// One edit inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Put(String, PrefValue),
    Remove(String),
}

/// An ordered set of edits committed together.
///
/// A `clear()` request is applied before any other edit in the batch,
/// whatever the order it was added in.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct WriteBatch {
    clear: bool,
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<PrefValue>) -> &mut Self {
        self.ops.push(WriteOp::Put(key.into(), value.into()));
        self
    }

    pub fn put_string(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.put(key, PrefValue::String(value.into()))
    }

    pub fn remove(&mut self, key: impl Into<String>) -> &mut Self {
        self.ops.push(WriteOp::Remove(key.into()));
        self
    }

    pub fn clear(&mut self) -> &mut Self {
        self.clear = true;
        self
    }

    pub fn is_clear(&self) -> bool {
        self.clear
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        !self.clear && self.ops.is_empty()
    }

    /// Apply the batch to an in-memory map, in commit order.
    pub(crate) fn apply_to(&self, map: &mut BTreeMap<String, PrefValue>) {
        if self.clear {
            map.clear();
        }
        for op in &self.ops {
            match op {
                WriteOp::Put(key, value) => {
                    map.insert(key.clone(), value.clone());
                }
                WriteOp::Remove(key) => {
                    map.remove(key);
                }
            }
        }
    }
}

/// A flat, string-keyed store of primitive values.
pub trait KeyValueStore: Send + Sync {
    /// Read one value.
    fn get(&self, key: &str) -> Result<Option<PrefValue>, StoreError>;

    /// Snapshot of every entry.
    fn all(&self) -> Result<BTreeMap<String, PrefValue>, StoreError>;

    /// Commit a batch of edits.
    fn apply(&self, batch: WriteBatch) -> Result<(), StoreError>;

    fn contains(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.get(key)?.is_some())
    }

    fn get_string(&self, key: &str, default: &str) -> Result<String, StoreError> {
        match self.get(key)? {
            Some(PrefValue::String(v)) => Ok(v),
            Some(other) => Err(StoreError::type_mismatch(key, ValueKind::String, other.kind())),
            None => Ok(default.to_string()),
        }
    }

    fn get_bool(&self, key: &str, default: bool) -> Result<bool, StoreError> {
        match self.get(key)? {
            Some(PrefValue::Bool(v)) => Ok(v),
            Some(other) => Err(StoreError::type_mismatch(key, ValueKind::Bool, other.kind())),
            None => Ok(default),
        }
    }

    fn get_long(&self, key: &str, default: i64) -> Result<i64, StoreError> {
        match self.get(key)? {
            Some(PrefValue::Long(v)) => Ok(v),
            Some(other) => Err(StoreError::type_mismatch(key, ValueKind::Long, other.kind())),
            None => Ok(default),
        }
    }

    fn get_int(&self, key: &str, default: i32) -> Result<i32, StoreError> {
        match self.get(key)? {
            Some(PrefValue::Int(v)) => Ok(v),
            Some(other) => Err(StoreError::type_mismatch(key, ValueKind::Int, other.kind())),
            None => Ok(default),
        }
    }

    fn get_float(&self, key: &str, default: f32) -> Result<f32, StoreError> {
        match self.get(key)? {
            Some(PrefValue::Float(v)) => Ok(v),
            Some(other) => Err(StoreError::type_mismatch(key, ValueKind::Float, other.kind())),
            None => Ok(default),
        }
    }
}
