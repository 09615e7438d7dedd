//! Typed preference properties over a [`KeyValueStore`](crate::storage::KeyValueStore).

pub mod property;
