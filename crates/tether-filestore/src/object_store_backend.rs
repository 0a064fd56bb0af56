//! `StorageBackend` adapter over the `object_store` crate.
//!
//! All physical backends (local filesystem, S3, GCS, Azure) are unified under
//! `Arc<dyn ObjectStore>`; the adapter never branches on which one it holds.
//! Hosts build the store with the `object_store` builders
//! (`AmazonS3Builder`, `GoogleCloudStorageBuilder`, `MicrosoftAzureBuilder`,
//! `LocalFileSystem`) and hand it in.

use crate::backend::{pending_bytes, StorageBackend, StorageHandle};
use crate::error::{FilestoreError, Result};
use async_trait::async_trait;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectStorePath;
use object_store::ObjectStore;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tether_commons::FileObject;

/// Storage backend over any `object_store` implementation.
pub struct ObjectStoreBackend {
    store: Arc<dyn ObjectStore>,

    /// Base URL prefixed onto signed links (e.g. a CDN or gateway origin)
    public_base_url: String,

    /// Secret mixed into signed-link tokens
    signing_secret: String,
}

impl ObjectStoreBackend {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        public_base_url: impl Into<String>,
        signing_secret: impl Into<String>,
    ) -> Self {
        Self {
            store,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            signing_secret: signing_secret.into(),
        }
    }

    /// Convenience constructor for a local-filesystem store rooted at `root`.
    pub fn local(
        root: impl AsRef<Path>,
        public_base_url: impl Into<String>,
        signing_secret: impl Into<String>,
    ) -> Result<Self> {
        let store = LocalFileSystem::new_with_prefix(root)
            .map_err(|e| FilestoreError::Config(format!("Invalid local storage root: {}", e)))?;
        Ok(Self::new(Arc::new(store), public_base_url, signing_secret))
    }

    fn object_key(&self, key: &str) -> ObjectStorePath {
        ObjectStorePath::from(key.trim_start_matches('/'))
    }
}

#[async_trait]
impl StorageBackend for ObjectStoreBackend {
    async fn save(&self, file: &FileObject) -> Result<StorageHandle> {
        let data = pending_bytes(file)?;
        let key = self.object_key(&file.storage_key);

        self.store
            .put(&key, data.into())
            .await
            .map_err(|e| FilestoreError::ObjectStore(e.to_string()))?;

        Ok(StorageHandle::new(&file.storage_key))
    }

    async fn delete(&self, handle: &StorageHandle) -> Result<()> {
        let key = self.object_key(&handle.key);

        match self.store.delete(&key).await {
            Ok(()) => Ok(()),
            // Idempotent delete: the object may already be gone.
            Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(FilestoreError::ObjectStore(e.to_string())),
        }
    }

    async fn sign(&self, handle: &StorageHandle, expiry: Duration) -> Result<String> {
        let expires_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| FilestoreError::Other(format!("System clock error: {}", e)))?
            .as_secs()
            + expiry.as_secs();

        let mut hasher = Sha256::new();
        hasher.update(self.signing_secret.as_bytes());
        hasher.update(b"\n");
        hasher.update(handle.key.as_bytes());
        hasher.update(b"\n");
        hasher.update(expires_at.to_string().as_bytes());
        let token = hex::encode(hasher.finalize());

        Ok(format!(
            "{}/{}?expires={}&token={}",
            self.public_base_url,
            handle.key.trim_start_matches('/'),
            expires_at,
            token
        ))
    }
}
