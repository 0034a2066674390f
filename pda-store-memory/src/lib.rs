#![warn(missing_docs)]
//! In-memory reference implementations of `pda-core`'s `FileHandleStore`
//! and `KeyValueStore`.
//!
//! Both are backed by a `HashMap` behind a `RwLock` for concurrent access.
//! Nothing here persists across process restarts; use `pda-store-fs` where
//! that matters.

use std::collections::HashMap;

use async_trait::async_trait;
use pda_core::{FileHandle, FileHandleStore, FileMetadata, FileRef, FileStoreError, KeyValueStore, StoreOptions};
use tokio::sync::RwLock;

struct Blob {
    bytes: Vec<u8>,
    mime_type: String,
    filename: Option<String>,
}

/// In-memory file handle store backed by a `HashMap` behind a `RwLock`.
///
/// Suitable for testing, prototyping, and single-process use cases where
/// persistence across restarts is not required.
pub struct MemoryFileStore {
    blobs: RwLock<HashMap<String, Blob>>,
}

impl MemoryFileStore {
    /// Create a new empty in-memory file store.
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryFileStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileHandleStore for MemoryFileStore {
    async fn store(&self, bytes: Vec<u8>, options: StoreOptions) -> Result<FileRef, FileStoreError> {
        let handle = FileHandle::fresh();
        let size = bytes.len() as u64;
        let mime_type = options.mime_type.unwrap_or_else(|| "application/octet-stream".to_string());
        let blob = Blob {
            bytes,
            mime_type: mime_type.clone(),
            filename: options.filename.clone(),
        };
        self.blobs.write().await.insert(handle.as_str().to_string(), blob);
        Ok(FileRef {
            handle,
            mime_type,
            filename: options.filename,
            size,
            temporary: Some(true),
        })
    }

    async fn retrieve(&self, handle: &FileHandle) -> Result<Option<Vec<u8>>, FileStoreError> {
        let blobs = self.blobs.read().await;
        Ok(blobs.get(handle.as_str()).map(|b| b.bytes.clone()))
    }

    async fn delete(&self, handle: &FileHandle) -> Result<(), FileStoreError> {
        self.blobs.write().await.remove(handle.as_str());
        Ok(())
    }

    async fn get_metadata(&self, handle: &FileHandle) -> Result<Option<FileMetadata>, FileStoreError> {
        let blobs = self.blobs.read().await;
        Ok(blobs.get(handle.as_str()).map(|b| FileMetadata {
            handle: handle.clone(),
            mime_type: b.mime_type.clone(),
            filename: b.filename.clone(),
            size: b.bytes.len() as u64,
        }))
    }
}

/// In-memory key-value store, used for `Pool` vendor-state persistence in
/// tests and single-process deployments that don't need durability.
pub struct MemoryKeyValueStore {
    data: RwLock<HashMap<String, serde_json::Value>>,
}

impl MemoryKeyValueStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryKeyValueStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, FileStoreError> {
        Ok(self.data.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), FileStoreError> {
        self.data.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), FileStoreError> {
        self.data.write().await.remove(key);
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, FileStoreError> {
        Ok(self.data.read().await.keys().filter(|k| k.starts_with(prefix)).cloned().collect())
    }
}
