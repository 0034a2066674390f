//! The File Handle Store: content-addressed temporary blob storage behind
//! an abstract interface. Reference implementations live in `pda-store-memory`
//! and `pda-store-fs`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::FileStoreError;
use crate::id::FileHandle;
use crate::result::FileRef;

/// Optional metadata supplied when storing a blob.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreOptions {
    pub mime_type: Option<String>,
    pub filename: Option<String>,
}

/// Metadata returned by `getMetadata`, independent of the blob bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
    pub handle: FileHandle,
    pub mime_type: String,
    pub filename: Option<String>,
    pub size: u64,
}

/// Capability set: `store`, `retrieve`, `delete`, `getMetadata`. Handles are
/// opaque fresh tokens with no required ordering; concurrent stores yield
/// distinct handles. Retrieval or metadata lookup of a handle that was never
/// stored, or has since been deleted, returns `None` rather than erroring —
/// absence is not a failure.
#[async_trait]
pub trait FileHandleStore: Send + Sync {
    /// Store bytes, minting a fresh handle.
    async fn store(&self, bytes: Vec<u8>, options: StoreOptions) -> Result<FileRef, FileStoreError>;

    /// Retrieve bytes by handle, or `None` if absent.
    async fn retrieve(&self, handle: &FileHandle) -> Result<Option<Vec<u8>>, FileStoreError>;

    /// Delete a handle's blob, if present. Deleting an absent handle is a no-op.
    async fn delete(&self, handle: &FileHandle) -> Result<(), FileStoreError>;

    /// Fetch metadata without the blob bytes, or `None` if absent.
    async fn get_metadata(&self, handle: &FileHandle) -> Result<Option<FileMetadata>, FileStoreError>;
}
