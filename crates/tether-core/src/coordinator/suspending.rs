//! Suspending coordinator: post-commit work on a detached Tokio task.

use super::{
    discard_on_rollback, prepare_commit_dispatch, record_flush, release_staged_dirs,
    DirtyInstance, TransactionContext,
};
use crate::error::Result;
use crate::plan::execute_plans;
use crate::registry::CoordinationRegistry;
use std::sync::Arc;
use tether_filestore::StorageBackend;
use tokio::task::JoinHandle;

/// Coordinator for async sessions.
///
/// `after_commit` hands the drained operation plan to a detached task so the
/// triggering commit call returns promptly; the returned `JoinHandle` may be
/// dropped (fire-and-forget) or awaited by hosts that want completion. Must
/// be called from within a Tokio runtime.
pub struct SuspendingCoordinator {
    storage: Arc<dyn StorageBackend>,
    registry: Arc<CoordinationRegistry>,
}

impl SuspendingCoordinator {
    pub fn new(storage: Arc<dyn StorageBackend>, registry: Arc<CoordinationRegistry>) -> Self {
        Self { storage, registry }
    }

    /// Before-flush hook: inspect and absorb every registered dirty slot.
    /// Runs on every flush; inspection errors abort the flush.
    pub fn before_flush(
        &self,
        txn: &mut TransactionContext,
        dirty: &[DirtyInstance],
    ) -> Result<()> {
        record_flush(&self.registry, txn, dirty)
    }

    /// After-commit hook: dispatch pending operations and staging cleanup as
    /// a detached task. At-most-once per transaction via the ledger's
    /// dispatch token; a duplicate hook invocation returns `None`.
    pub fn after_commit(&self, txn: &mut TransactionContext) -> Option<JoinHandle<()>> {
        let prepared = prepare_commit_dispatch(txn);
        txn.close();
        let (plans, staged) = prepared?;

        let storage = Arc::clone(&self.storage);
        Some(tokio::spawn(async move {
            execute_plans(storage.as_ref(), plans).await;
            release_staged_dirs(&staged);
        }))
    }

    /// After-rollback hook: discard pending descriptors and release staged
    /// content. Never fails; cleanup problems are logged only.
    pub fn after_rollback(&self, txn: &mut TransactionContext) {
        discard_on_rollback(txn);
        txn.close();
    }
}
