//! The immutable file value object and the attribute shapes it appears in.
//!
//! A `FileObject` is a value: replacing the file on an attribute means
//! assigning a new `FileObject`, never mutating one in place. Diffing
//! identifies objects by `storage_key`.

use crate::ids::ListToken;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// Content of a not-yet-committed file.
///
/// Uploads are deferred until the owning transaction commits, so the bytes
/// must remain reachable until then: either held inline or staged on local
/// disk (see `tether-filestore::StagingArea`). A `FileObject` read back from
/// the committed baseline carries no content at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    /// Bytes held in memory until commit.
    Inline(Bytes),
    /// Path to a staged temp file holding the bytes.
    Staged(PathBuf),
}

/// Immutable file value object.
///
/// `storage_key` is the object key in the storage backend and the identity
/// used for change detection. Metadata and content are carried alongside;
/// content is never serialized (the serialized form is the committed
/// database reference).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileObject {
    /// Object key in the storage backend
    pub storage_key: String,

    /// Original filename (preserved for display/download)
    pub filename: String,

    /// MIME type (e.g. "image/png", "application/pdf")
    pub content_type: String,

    /// Content size in bytes
    pub size: u64,

    /// SHA-256 hash of content (hex-encoded)
    pub sha256: String,

    /// Free-form metadata attached by the host
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,

    /// Pending content; `None` once committed to the backend
    #[serde(skip)]
    pub content: Option<FileContent>,
}

impl FileObject {
    /// Build a new pending file object from in-memory bytes, computing size
    /// and checksum.
    pub fn from_bytes(
        storage_key: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: Bytes,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(&data);
        let sha256 = hex::encode(hasher.finalize());

        Self {
            storage_key: storage_key.into(),
            filename: filename.into(),
            content_type: content_type.into(),
            size: data.len() as u64,
            sha256,
            metadata: serde_json::Map::new(),
            content: Some(FileContent::Inline(data)),
        }
    }

    /// Build a reference to an already-committed file (no content carried).
    pub fn committed(
        storage_key: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        size: u64,
        sha256: impl Into<String>,
    ) -> Self {
        Self {
            storage_key: storage_key.into(),
            filename: filename.into(),
            content_type: content_type.into(),
            size,
            sha256: sha256.into(),
            metadata: serde_json::Map::new(),
            content: None,
        }
    }

    /// Attach a metadata entry, consuming and returning the object.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Whether this object still carries content to upload.
    pub fn has_content(&self) -> bool {
        self.content.is_some()
    }

    /// Identity comparison for change detection.
    pub fn same_key(&self, other: &FileObject) -> bool {
        self.storage_key == other.storage_key
    }
}

/// A list-valued attribute: the element vector plus the in-memory identity of
/// the list object itself.
#[derive(Debug, Clone)]
pub struct FileList {
    pub token: ListToken,
    pub items: Vec<FileObject>,
}

impl FileList {
    pub fn new(token: ListToken, items: Vec<FileObject>) -> Self {
        Self { token, items }
    }
}

/// The value shape of one file-valued attribute at one point in time.
#[derive(Debug, Clone)]
pub enum FileValue {
    /// No file assigned
    Absent,
    /// Single file
    Single(FileObject),
    /// List of files
    List(FileList),
}

impl FileValue {
    pub fn single(file: FileObject) -> Self {
        Self::Single(file)
    }

    pub fn list(token: ListToken, items: Vec<FileObject>) -> Self {
        Self::List(FileList::new(token, items))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}
