//! Local staging for deferred upload content.
//!
//! Nothing is written to the storage backend before its transaction commits,
//! so file content handed to the session mid-transaction has to live
//! somewhere until then. Small payloads stay inline as `Bytes`; larger ones
//! are staged under a temp directory and referenced by path
//! (`FileContent::Staged`). Staged files are released after commit dispatch
//! or on rollback, and a sweep pass removes directories abandoned by a
//! crashed host.

use crate::error::{FilestoreError, Result};
use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tether_commons::{FileContent, FileObject};

/// A staged file with metadata computed at stage time.
#[derive(Debug, Clone)]
pub struct StagedFile {
    /// Path to the staged content
    pub path: PathBuf,

    /// Original filename
    pub original_name: String,

    /// Content size in bytes
    pub size: u64,

    /// MIME type (provided or detected)
    pub mime_type: String,

    /// SHA-256 hash of content (hex-encoded)
    pub sha256: String,
}

impl StagedFile {
    /// Delete the staged content.
    pub fn release(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                FilestoreError::Staging(format!("Failed to release staged file: {}", e))
            })?;
        }
        Ok(())
    }

    /// Turn the staged content into a pending `FileObject` under the given
    /// storage key. The object references the staged path; the bytes are read
    /// back at upload time.
    pub fn into_file_object(self, storage_key: impl Into<String>) -> FileObject {
        FileObject {
            storage_key: storage_key.into(),
            filename: self.original_name,
            content_type: self.mime_type,
            size: self.size,
            sha256: self.sha256,
            metadata: serde_json::Map::new(),
            content: Some(FileContent::Staged(self.path)),
        }
    }
}

/// Manages the staging directory for deferred upload content.
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Create a scope directory (typically one per transaction) under the
    /// staging root.
    pub fn create_scope_dir(&self, scope: &str) -> Result<PathBuf> {
        let dir = self.root.join(sanitize_component(scope));
        fs::create_dir_all(&dir).map_err(|e| {
            FilestoreError::Staging(format!("Failed to create staging directory: {}", e))
        })?;
        Ok(dir)
    }

    /// Write content into the scope directory, computing size, checksum, and
    /// MIME type.
    pub fn stage(
        &self,
        scope_dir: &Path,
        file_name: &str,
        original_name: &str,
        data: Bytes,
        provided_mime: Option<&str>,
    ) -> Result<StagedFile> {
        let path = scope_dir.join(sanitize_component(file_name));

        let mut file = fs::File::create(&path)
            .map_err(|e| FilestoreError::Staging(format!("Failed to create staged file: {}", e)))?;

        let mut hasher = Sha256::new();
        hasher.update(&data);

        file.write_all(&data)
            .map_err(|e| FilestoreError::Staging(format!("Failed to write staged file: {}", e)))?;
        file.sync_all()
            .map_err(|e| FilestoreError::Staging(format!("Failed to sync staged file: {}", e)))?;

        let mime_type = provided_mime
            .map(str::to_string)
            .unwrap_or_else(|| detect_mime(original_name, &data));

        Ok(StagedFile {
            path,
            original_name: original_name.to_string(),
            size: data.len() as u64,
            mime_type,
            sha256: hex::encode(hasher.finalize()),
        })
    }

    /// Remove a scope directory and everything under it.
    pub fn release_scope_dir(&self, scope_dir: &Path) -> Result<()> {
        if scope_dir.exists() && scope_dir.starts_with(&self.root) {
            fs::remove_dir_all(scope_dir).map_err(|e| {
                FilestoreError::Staging(format!("Failed to release staging directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Remove scope directories older than `max_age_secs`. Leftovers from a
    /// host that died mid-transaction; failures are logged, not raised.
    pub fn sweep_stale(&self, max_age_secs: u64) -> Result<usize> {
        if !self.root.exists() {
            return Ok(0);
        }

        let now = std::time::SystemTime::now();
        let mut swept = 0;

        for entry in fs::read_dir(&self.root)
            .map_err(|e| FilestoreError::Staging(format!("Failed to read staging root: {}", e)))?
        {
            let entry = entry
                .map_err(|e| FilestoreError::Staging(format!("Failed to read entry: {}", e)))?;

            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            let Ok(modified) = metadata.created().or_else(|_| metadata.modified()) else {
                continue;
            };
            let Ok(age) = now.duration_since(modified) else {
                continue;
            };

            if age.as_secs() >= max_age_secs {
                if let Err(e) = fs::remove_dir_all(entry.path()) {
                    log::warn!("Failed to sweep stale staging dir {:?}: {}", entry.path(), e);
                } else {
                    swept += 1;
                }
            }
        }

        Ok(swept)
    }
}

/// Strip path-traversal and control characters from a path component.
fn sanitize_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len().min(128));
    let mut dots = 0;

    for c in s.chars() {
        if !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')) {
            continue;
        }
        if c == '.' {
            dots += 1;
            if dots > 1 {
                continue;
            }
        } else {
            dots = 0;
        }
        out.push(c);
        if out.len() >= 128 {
            break;
        }
    }

    out
}

/// Detect MIME type from magic bytes, falling back to the file extension.
fn detect_mime(filename: &str, data: &[u8]) -> String {
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        return "image/png".to_string();
    }
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return "image/jpeg".to_string();
    }
    if data.starts_with(b"%PDF") {
        return "application/pdf".to_string();
    }
    if data.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
        return "application/zip".to_string();
    }

    match filename.rsplit('.').next().map(str::to_lowercase).as_deref() {
        Some("txt") => "text/plain",
        Some("md") => "text/markdown",
        Some("html") | Some("htm") => "text/html",
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("svg") => "image/svg+xml",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("mp4") => "video/mp4",
        Some("mp3") => "audio/mpeg",
        _ => "application/octet-stream",
    }
    .to_string()
}
