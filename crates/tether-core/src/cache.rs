//! Cache invalidation at commit time.
//!
//! A parallel, simpler subscriber to the same lifecycle: once a transaction
//! durably commits, every cache entry keyed by a touched instance's identity
//! is invalidated. Rolled-back transactions never invalidate (rollback clears
//! the touched set before this runs).

use crate::coordinator::TransactionContext;
use std::collections::HashSet;
use std::sync::Arc;
use tether_commons::CacheKey;

/// Consumed invalidate-by-key contract; fire-and-forget. The cache's internal
/// storage and eviction are its own business.
pub trait CacheBackend: Send + Sync {
    fn invalidate(&self, key: &CacheKey);
}

/// Invalidates derived cache entries for instances committed in a
/// transaction.
pub struct CacheInvalidationCoordinator {
    cache: Arc<dyn CacheBackend>,
}

impl CacheInvalidationCoordinator {
    pub fn new(cache: Arc<dyn CacheBackend>) -> Self {
        Self { cache }
    }

    /// After-commit hook. Runs after file operations are dispatched but does
    /// not depend on their success. Each `(entity, primary key)` is
    /// invalidated at most once per commit, regardless of how many attribute
    /// changes touched the instance.
    pub fn after_commit(&self, txn: &TransactionContext) {
        let mut seen: HashSet<CacheKey> = HashSet::new();

        for key in txn.committed_cache_keys() {
            if seen.insert(key.clone()) {
                log::debug!("Invalidating cache entry {}", key);
                self.cache.invalidate(&key);
            }
        }
    }
}
