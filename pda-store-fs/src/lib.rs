#![warn(missing_docs)]
//! Filesystem-backed reference implementations of `pda-core`'s
//! `FileHandleStore` and `KeyValueStore`.
//!
//! Directory layout:
//! ```text
//! root/
//!   files/
//!     <handle>.bin         the blob bytes
//!     <handle>.meta.json   {mimeType, filename, size}
//!   kv/
//!     <url-encoded-key>.json
//! ```
//!
//! Suitable for development and single-machine deployments where data must
//! survive process restarts without a database.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pda_core::{FileHandle, FileHandleStore, FileMetadata, FileRef, FileStoreError, KeyValueStore, StoreOptions};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
struct StoredMetadata {
    mime_type: String,
    filename: Option<String>,
    size: u64,
}

/// Filesystem-backed file handle store, rooted at `<root>/files`.
pub struct FsFileStore {
    root: PathBuf,
}

impl FsFileStore {
    /// Create a new store rooted at the given directory. The directory is
    /// created lazily on first write.
    pub fn new(root: &Path) -> Self {
        Self { root: root.to_path_buf() }
    }

    fn blob_path(&self, handle: &FileHandle) -> PathBuf {
        self.root.join("files").join(format!("{}.bin", handle.as_str()))
    }

    fn meta_path(&self, handle: &FileHandle) -> PathBuf {
        self.root.join("files").join(format!("{}.meta.json", handle.as_str()))
    }
}

#[async_trait]
impl FileHandleStore for FsFileStore {
    async fn store(&self, bytes: Vec<u8>, options: StoreOptions) -> Result<FileRef, FileStoreError> {
        let dir = self.root.join("files");
        tokio::fs::create_dir_all(&dir).await.map_err(|e| FileStoreError::Io(e.to_string()))?;

        let handle = FileHandle::fresh();
        let size = bytes.len() as u64;
        let mime_type = options.mime_type.unwrap_or_else(|| "application/octet-stream".to_string());

        tokio::fs::write(self.blob_path(&handle), &bytes)
            .await
            .map_err(|e| FileStoreError::Io(e.to_string()))?;

        let meta = StoredMetadata {
            mime_type: mime_type.clone(),
            filename: options.filename.clone(),
            size,
        };
        let meta_json = serde_json::to_string_pretty(&meta).map_err(|e| FileStoreError::Io(e.to_string()))?;
        tokio::fs::write(self.meta_path(&handle), meta_json)
            .await
            .map_err(|e| FileStoreError::Io(e.to_string()))?;

        Ok(FileRef {
            handle,
            mime_type,
            filename: options.filename,
            size,
            temporary: Some(false),
        })
    }

    async fn retrieve(&self, handle: &FileHandle) -> Result<Option<Vec<u8>>, FileStoreError> {
        match tokio::fs::read(self.blob_path(handle)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(FileStoreError::Io(e.to_string())),
        }
    }

    async fn delete(&self, handle: &FileHandle) -> Result<(), FileStoreError> {
        for path in [self.blob_path(handle), self.meta_path(handle)] {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(FileStoreError::Io(e.to_string())),
            }
        }
        Ok(())
    }

    async fn get_metadata(&self, handle: &FileHandle) -> Result<Option<FileMetadata>, FileStoreError> {
        let contents = match tokio::fs::read_to_string(self.meta_path(handle)).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(FileStoreError::Io(e.to_string())),
        };
        let meta: StoredMetadata = serde_json::from_str(&contents).map_err(|e| FileStoreError::Io(e.to_string()))?;
        Ok(Some(FileMetadata {
            handle: handle.clone(),
            mime_type: meta.mime_type,
            filename: meta.filename,
            size: meta.size,
        }))
    }
}

/// Encode a key into a safe filename.
fn key_to_filename(key: &str) -> String {
    let mut encoded = String::new();
    for ch in key.chars() {
        match ch {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => encoded.push(ch),
            _ => {
                for byte in ch.to_string().as_bytes() {
                    encoded.push_str(&format!("%{byte:02X}"));
                }
            }
        }
    }
    format!("{encoded}.json")
}

/// Decode a filename back to a key.
fn filename_to_key(filename: &str) -> Option<String> {
    let name = filename.strip_suffix(".json")?;
    let mut result = Vec::new();
    let bytes = name.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok()?;
            let byte = u8::from_str_radix(hex, 16).ok()?;
            result.push(byte);
            i += 3;
        } else {
            result.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(result).ok()
}

/// Filesystem-backed key-value store, rooted at `<root>/kv`. Used for
/// `Pool` vendor-state persistence when durability across restarts matters.
pub struct FsKeyValueStore {
    root: PathBuf,
}

impl FsKeyValueStore {
    /// Create a new store rooted at the given directory.
    pub fn new(root: &Path) -> Self {
        Self { root: root.to_path_buf() }
    }

    fn dir(&self) -> PathBuf {
        self.root.join("kv")
    }
}

#[async_trait]
impl KeyValueStore for FsKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, FileStoreError> {
        let path = self.dir().join(key_to_filename(key));
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => {
                let value = serde_json::from_str(&contents).map_err(|e| FileStoreError::Io(e.to_string()))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(FileStoreError::Io(e.to_string())),
        }
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), FileStoreError> {
        let dir = self.dir();
        tokio::fs::create_dir_all(&dir).await.map_err(|e| FileStoreError::Io(e.to_string()))?;
        let path = dir.join(key_to_filename(key));
        let contents = serde_json::to_string_pretty(&value).map_err(|e| FileStoreError::Io(e.to_string()))?;
        tokio::fs::write(&path, contents).await.map_err(|e| FileStoreError::Io(e.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), FileStoreError> {
        let path = self.dir().join(key_to_filename(key));
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FileStoreError::Io(e.to_string())),
        }
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, FileStoreError> {
        let mut entries = match tokio::fs::read_dir(self.dir()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(FileStoreError::Io(e.to_string())),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| FileStoreError::Io(e.to_string()))? {
            if let Some(filename) = entry.file_name().to_str() {
                if let Some(key) = filename_to_key(filename) {
                    if key.starts_with(prefix) {
                        keys.push(key);
                    }
                }
            }
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_encoding_roundtrip() {
        let keys = ["simple", "vendor:a", "path/to/key", "has spaces", "emoji🎉"];
        for key in &keys {
            let filename = key_to_filename(key);
            let decoded = filename_to_key(&filename).unwrap();
            assert_eq!(*key, decoded, "roundtrip failed for {key}");
        }
    }

    #[tokio::test]
    async fn store_then_retrieve_round_trips_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsFileStore::new(dir.path());
        let file_ref = store
            .store(b"hello".to_vec(), StoreOptions { mime_type: Some("text/plain".into()), filename: None })
            .await
            .unwrap();
        let bytes = store.retrieve(&file_ref.handle).await.unwrap();
        assert_eq!(bytes, Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn retrieve_of_absent_handle_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsFileStore::new(dir.path());
        let absent = FileHandle::fresh();
        assert_eq!(store.retrieve(&absent).await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_then_retrieve_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsFileStore::new(dir.path());
        let file_ref = store.store(b"bye".to_vec(), StoreOptions::default()).await.unwrap();
        store.delete(&file_ref.handle).await.unwrap();
        assert_eq!(store.retrieve(&file_ref.handle).await.unwrap(), None);
    }

    #[tokio::test]
    async fn kv_write_and_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let kv = FsKeyValueStore::new(dir.path());
        kv.set("vendor:a", json!({"id": "a", "minTime": 500})).await.unwrap();
        let value = kv.get("vendor:a").await.unwrap();
        assert_eq!(value, Some(json!({"id": "a", "minTime": 500})));
    }

    #[tokio::test]
    async fn kv_list_keys_with_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let kv = FsKeyValueStore::new(dir.path());
        kv.set("vendor:a", json!(1)).await.unwrap();
        kv.set("vendor:b", json!(2)).await.unwrap();
        kv.set("other:c", json!(3)).await.unwrap();

        let mut keys = kv.list_keys("vendor:").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["vendor:a", "vendor:b"]);
    }

    #[tokio::test]
    async fn kv_get_nonexistent_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let kv = FsKeyValueStore::new(dir.path());
        assert_eq!(kv.get("missing").await.unwrap(), None);
    }
}
