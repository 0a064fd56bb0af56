//! Shared fixtures for coordinator integration tests.

#![allow(dead_code)]

use bytes::Bytes;
use std::sync::{Arc, Mutex};
use tether_commons::{AttributeName, CacheKey, EntityName, FileObject, FileValue, InstanceId};
use tether_core::cache::CacheBackend;
use tether_core::coordinator::{DirtyInstance, SlotChange};
use tether_core::registry::CoordinationRegistry;

/// Cache backend recording every invalidation.
pub struct RecordingCache {
    invalidated: Mutex<Vec<CacheKey>>,
}

impl RecordingCache {
    pub fn new() -> Self {
        Self {
            invalidated: Mutex::new(Vec::new()),
        }
    }

    pub fn invalidated(&self) -> Vec<CacheKey> {
        self.invalidated.lock().unwrap().clone()
    }
}

impl CacheBackend for RecordingCache {
    fn invalidate(&self, key: &CacheKey) {
        self.invalidated.lock().unwrap().push(key.clone());
    }
}

/// A registry with `Document { file, attachments }` opted in.
pub fn document_registry() -> Arc<CoordinationRegistry> {
    let registry = CoordinationRegistry::new();
    registry.register(EntityName::from("Document"), ["file", "attachments"]);
    Arc::new(registry)
}

/// A not-yet-committed file carrying inline content.
pub fn pending(key: &str) -> FileObject {
    FileObject::from_bytes(key, key, "application/octet-stream", Bytes::from("payload"))
}

/// A committed baseline reference (no content).
pub fn committed(key: &str) -> FileObject {
    FileObject::committed(key, key, "application/octet-stream", 7, "sha")
}

/// One dirty `Document` with a single slot change on `file`.
pub fn dirty_document(
    instance: u64,
    primary_key: Option<&str>,
    baseline: FileValue,
    current: FileValue,
) -> DirtyInstance {
    DirtyInstance {
        instance: InstanceId::new(instance),
        entity: EntityName::from("Document"),
        primary_key: primary_key.map(str::to_string),
        changes: vec![SlotChange {
            attribute: AttributeName::from("file"),
            baseline,
            current,
        }],
    }
}
