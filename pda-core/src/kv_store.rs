//! The abstract key-value interface the Pool requires for durable state.
//!
//! Deliberately minimal: get/set/delete over flat string keys and JSON
//! values. The Pool is the only caller and only ever touches keys of the
//! form `vendor:<id>`; it never assumes anything about how a backend
//! stores or indexes them.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::FileStoreError;

/// A pluggable persistence backend for `Pool` vendor-state snapshots.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value by key. Returns `None` if the key doesn't exist.
    async fn get(&self, key: &str) -> Result<Option<Value>, FileStoreError>;

    /// Write a value, creating or overwriting.
    async fn set(&self, key: &str, value: Value) -> Result<(), FileStoreError>;

    /// Delete a value. No-op if the key doesn't exist.
    async fn delete(&self, key: &str) -> Result<(), FileStoreError>;

    /// List keys under a prefix, used by `clearStorage` to find all `vendor:*` keys.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, FileStoreError>;
}
