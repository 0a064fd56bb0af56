//! In-memory storage backend recording every operation, for tests.

use crate::backend::{pending_bytes, StorageBackend, StorageHandle};
use crate::error::{FilestoreError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use tether_commons::FileObject;

/// One recorded backend call, in dispatch order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedOp {
    Save(String),
    Delete(String),
    Sign(String),
}

/// Operation-recording in-memory backend.
///
/// Keys listed via `fail_save_on` make the corresponding `save` fail, for
/// exercising the coordinator's per-slot failure isolation.
#[derive(Default)]
pub struct InMemoryBackend {
    objects: Mutex<HashMap<String, Bytes>>,
    ops: Mutex<Vec<RecordedOp>>,
    failing_saves: Mutex<HashSet<String>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `save` fail for this storage key.
    pub fn fail_save_on(&self, key: impl Into<String>) {
        self.failing_saves.lock().unwrap().insert(key.into());
    }

    /// All operations dispatched so far, in order.
    pub fn ops(&self) -> Vec<RecordedOp> {
        self.ops.lock().unwrap().clone()
    }

    /// Whether an object currently exists under the key.
    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    /// Content currently stored under the key.
    pub fn object(&self, key: &str) -> Option<Bytes> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StorageBackend for InMemoryBackend {
    async fn save(&self, file: &FileObject) -> Result<StorageHandle> {
        if self.failing_saves.lock().unwrap().contains(&file.storage_key) {
            return Err(FilestoreError::ObjectStore(format!(
                "Injected save failure for '{}'",
                file.storage_key
            )));
        }

        let data = pending_bytes(file)?;
        self.objects
            .lock()
            .unwrap()
            .insert(file.storage_key.clone(), data);
        self.ops
            .lock()
            .unwrap()
            .push(RecordedOp::Save(file.storage_key.clone()));

        Ok(StorageHandle::new(&file.storage_key))
    }

    async fn delete(&self, handle: &StorageHandle) -> Result<()> {
        // Idempotent: removing an absent key is fine.
        self.objects.lock().unwrap().remove(&handle.key);
        self.ops
            .lock()
            .unwrap()
            .push(RecordedOp::Delete(handle.key.clone()));
        Ok(())
    }

    async fn sign(&self, handle: &StorageHandle, expiry: Duration) -> Result<String> {
        self.ops
            .lock()
            .unwrap()
            .push(RecordedOp::Sign(handle.key.clone()));
        Ok(format!(
            "memory://{}?expires_in={}",
            handle.key,
            expiry.as_secs()
        ))
    }
}
