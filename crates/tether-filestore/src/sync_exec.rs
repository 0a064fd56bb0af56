//! Drive storage futures to completion from blocking call sites.
//!
//! The blocking coordinator variant runs inside hosts that are not async;
//! its storage work still goes through the async `StorageBackend` trait.
//! When a Tokio runtime is already running on this thread, `block_on` would
//! panic, so the future is driven from a scoped helper thread instead;
//! otherwise a throwaway current-thread runtime does the job.

use crate::error::{FilestoreError, Result};
use std::future::Future;

/// Run `fut` to completion on the current thread.
pub fn block_on_storage<F, T>(fut: F) -> Result<T>
where
    F: Future<Output = T> + Send,
    T: Send,
{
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        std::thread::scope(|s| s.spawn(|| handle.block_on(fut)).join())
            .map_err(|_| FilestoreError::Other("Storage thread panicked".into()))
    } else {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| FilestoreError::Other(format!("Failed to create runtime: {}", e)))?;

        Ok(rt.block_on(fut))
    }
}
