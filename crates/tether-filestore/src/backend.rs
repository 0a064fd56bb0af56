//! The storage capability trait driven by the lifecycle coordinators.

use crate::error::{FilestoreError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use tether_commons::{FileContent, FileObject};

/// Handle to a stored object, returned by `save` and consumed by
/// `delete`/`sign`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageHandle {
    pub key: String,
}

impl StorageHandle {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl std::fmt::Display for StorageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key)
    }
}

/// External save/delete/sign capability over a file backend.
///
/// The coordinator only sequences calls against this trait; backend-specific
/// behavior stays behind it. Implementations must tolerate concurrent calls
/// for different objects.
///
/// `delete` is idempotent: deleting an absent object is not an error.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Persist the file's pending content under its storage key.
    async fn save(&self, file: &FileObject) -> Result<StorageHandle>;

    /// Remove the object. Absent objects are silently accepted.
    async fn delete(&self, handle: &StorageHandle) -> Result<()>;

    /// Produce a time-limited URL for direct access to the object.
    async fn sign(&self, handle: &StorageHandle, expiry: Duration) -> Result<String>;
}

/// Resolve a pending file's bytes, reading staged content from disk.
///
/// Fails with `MissingContent` for committed references, which by definition
/// carry nothing to upload.
pub(crate) fn pending_bytes(file: &FileObject) -> Result<Bytes> {
    match &file.content {
        Some(FileContent::Inline(bytes)) => Ok(bytes.clone()),
        Some(FileContent::Staged(path)) => std::fs::read(path).map(Bytes::from).map_err(|e| {
            FilestoreError::Staging(format!(
                "Failed to read staged content at {}: {}",
                path.display(),
                e
            ))
        }),
        None => Err(FilestoreError::MissingContent(file.storage_key.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_bytes_inline() {
        let file = FileObject::from_bytes("k", "a.bin", "application/octet-stream", Bytes::from("abc"));
        assert_eq!(pending_bytes(&file).unwrap(), Bytes::from("abc"));
    }

    #[test]
    fn test_pending_bytes_missing() {
        let file = FileObject::committed("k", "a.bin", "application/octet-stream", 3, "x");
        assert!(matches!(
            pending_bytes(&file),
            Err(FilestoreError::MissingContent(_))
        ));
    }
}
