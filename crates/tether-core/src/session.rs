//! Session-factory wiring.
//!
//! A host installs one coordinator set per session factory: the blocking and
//! suspending variants over the same storage backend and registry, plus the
//! cache invalidation coordinator. Hosts that bypass a structured factory
//! path can fall back to a single process-global set.

use crate::cache::{CacheBackend, CacheInvalidationCoordinator};
use crate::coordinator::{BlockingCoordinator, SuspendingCoordinator, TransactionContext};
use crate::registry::CoordinationRegistry;
use std::sync::{Arc, OnceLock};
use tether_filestore::StorageBackend;

/// The installed coordinator pair for one session factory.
///
/// Which variant a session uses is decided here, at construction time, by the
/// kind of session the factory produces, never by a runtime flag checked per
/// call.
pub struct SessionCoordinators {
    pub registry: Arc<CoordinationRegistry>,
    pub blocking: BlockingCoordinator,
    pub suspending: SuspendingCoordinator,
    pub cache: CacheInvalidationCoordinator,
}

impl SessionCoordinators {
    /// Build the full coordinator set over one storage backend, cache, and
    /// participation registry. Called once per session factory.
    pub fn install(
        storage: Arc<dyn StorageBackend>,
        cache: Arc<dyn CacheBackend>,
        registry: Arc<CoordinationRegistry>,
    ) -> Self {
        Self {
            blocking: BlockingCoordinator::new(Arc::clone(&storage), Arc::clone(&registry)),
            suspending: SuspendingCoordinator::new(storage, Arc::clone(&registry)),
            cache: CacheInvalidationCoordinator::new(cache),
            registry,
        }
    }

    /// Fresh per-transaction bookkeeping; one per transaction the session
    /// opens.
    pub fn begin_transaction(&self) -> TransactionContext {
        TransactionContext::new()
    }
}

static GLOBAL: OnceLock<SessionCoordinators> = OnceLock::new();

/// Install the process-global fallback coordinator set. Returns `false` if a
/// set was already installed (the first installation wins).
pub fn install_global(coordinators: SessionCoordinators) -> bool {
    GLOBAL.set(coordinators).is_ok()
}

/// The process-global fallback set, if one was installed.
pub fn global() -> Option<&'static SessionCoordinators> {
    GLOBAL.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_commons::CacheKey;
    use tether_filestore::InMemoryBackend;

    struct NullCache;

    impl CacheBackend for NullCache {
        fn invalidate(&self, _key: &CacheKey) {}
    }

    fn coordinators() -> SessionCoordinators {
        SessionCoordinators::install(
            Arc::new(InMemoryBackend::new()),
            Arc::new(NullCache),
            Arc::new(CoordinationRegistry::new()),
        )
    }

    #[test]
    fn test_global_fallback_installs_once() {
        assert!(install_global(coordinators()));
        assert!(!install_global(coordinators()));

        let installed = global().expect("global set should be installed");
        let txn = installed.begin_transaction();
        assert!(!txn.is_dirty());
    }
}
