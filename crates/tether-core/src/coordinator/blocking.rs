//! Blocking coordinator: post-commit work driven to completion in place.

use super::{
    discard_on_rollback, prepare_commit_dispatch, record_flush, release_staged_dirs,
    DirtyInstance, TransactionContext,
};
use crate::error::Result;
use crate::plan::execute_plans;
use crate::registry::CoordinationRegistry;
use std::sync::Arc;
use tether_filestore::{sync_exec::block_on_storage, StorageBackend};

/// Coordinator for synchronous sessions.
///
/// Identical decision logic to the suspending variant; the storage future is
/// driven to completion on the calling thread before `after_commit` returns.
pub struct BlockingCoordinator {
    storage: Arc<dyn StorageBackend>,
    registry: Arc<CoordinationRegistry>,
}

impl BlockingCoordinator {
    pub fn new(storage: Arc<dyn StorageBackend>, registry: Arc<CoordinationRegistry>) -> Self {
        Self { storage, registry }
    }

    /// Before-flush hook: inspect and absorb every registered dirty slot.
    pub fn before_flush(
        &self,
        txn: &mut TransactionContext,
        dirty: &[DirtyInstance],
    ) -> Result<()> {
        record_flush(&self.registry, txn, dirty)
    }

    /// After-commit hook: run pending operations synchronously. Storage
    /// failures inside the batch are logged per-operation; a failure to
    /// drive the batch at all is logged here. Nothing is raised; the
    /// transaction is already committed.
    pub fn after_commit(&self, txn: &mut TransactionContext) {
        let prepared = prepare_commit_dispatch(txn);
        txn.close();
        let Some((plans, staged)) = prepared else {
            return;
        };

        let storage = Arc::clone(&self.storage);
        let result = block_on_storage(async move {
            execute_plans(storage.as_ref(), plans).await;
        });
        if let Err(e) = result {
            log::error!("Post-commit storage dispatch failed: {}", e);
        }

        release_staged_dirs(&staged);
    }

    /// After-rollback hook: discard pending descriptors and release staged
    /// content.
    pub fn after_rollback(&self, txn: &mut TransactionContext) {
        discard_on_rollback(txn);
        txn.close();
    }
}
