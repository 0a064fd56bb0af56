//! Lifecycle coordinators: the subscribers bridging session hooks to storage.
//!
//! Two variants share all decision logic and differ only in how storage
//! futures are driven: `SuspendingCoordinator` dispatches post-commit work as
//! a detached Tokio task, `BlockingCoordinator` drives the same future to
//! completion on the calling thread. The variant is selected statically at
//! session-factory construction; there is no runtime "is this session async"
//! branching.

mod blocking;
mod suspending;

pub use blocking::BlockingCoordinator;
pub use suspending::SuspendingCoordinator;

use crate::error::Result;
use crate::inspect::inspect;
use crate::ledger::{Ledger, LedgerState};
use crate::plan::{plan_operations, SlotPlan};
use crate::registry::CoordinationRegistry;
use std::collections::HashMap;
use std::path::PathBuf;
use tether_commons::{AttributeName, CacheKey, EntityName, FileValue, InstanceId, SlotKey};

/// One file-valued attribute's flush-time history: the committed baseline and
/// the current in-session value, as read from the host's dirty-attribute
/// tracking.
#[derive(Debug)]
pub struct SlotChange {
    pub attribute: AttributeName,
    pub baseline: FileValue,
    pub current: FileValue,
}

/// One dirty instance as presented by the host at before-flush.
///
/// `primary_key` may still be unassigned for freshly created instances; it
/// can be backfilled after the flush resolves it (see
/// [`TransactionContext::note_primary_key`]).
#[derive(Debug)]
pub struct DirtyInstance {
    pub instance: InstanceId,
    pub entity: EntityName,
    pub primary_key: Option<String>,
    pub changes: Vec<SlotChange>,
}

/// Per-transaction bookkeeping: the ledger, the instances touched (for cache
/// invalidation), and staged temp content to release at transaction end.
///
/// One context per transaction, owned by the host session and passed
/// explicitly into every hook. Never shared across transactions.
#[derive(Debug, Default)]
pub struct TransactionContext {
    ledger: Ledger,
    touched: HashMap<InstanceId, (EntityName, Option<String>)>,
    staged_dirs: Vec<PathBuf>,
}

impl TransactionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Backfill the primary key of an instance once the flush resolved it.
    pub fn note_primary_key(&mut self, instance: InstanceId, key: impl Into<String>) {
        if let Some((_, pk)) = self.touched.get_mut(&instance) {
            *pk = Some(key.into());
        }
    }

    /// Register a staging directory whose content belongs to this
    /// transaction; released after commit dispatch or on rollback.
    pub fn register_staged_dir(&mut self, dir: PathBuf) {
        self.staged_dirs.push(dir);
    }

    /// Cache keys for every touched instance whose primary key resolved.
    pub fn committed_cache_keys(&self) -> Vec<CacheKey> {
        self.touched
            .values()
            .filter_map(|(entity, pk)| {
                pk.as_ref().map(|pk| CacheKey::new(entity.clone(), pk.clone()))
            })
            .collect()
    }

    pub fn is_dirty(&self) -> bool {
        !self.ledger.is_empty()
    }

    /// Terminal: the coordinators close the context once the transaction's
    /// final hook has run. Touched-instance bookkeeping survives for the
    /// cache invalidation pass.
    pub fn close(&mut self) {
        self.ledger.close();
    }

    fn take_staged_dirs(&mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.staged_dirs)
    }
}

/// Shared before-flush logic: inspect every registered slot of every dirty
/// instance and absorb the descriptors. Runs on every flush, possibly several
/// times before commit; absorption is idempotent across re-flushes.
///
/// Only entities registered for file coordination participate, including in
/// cache-invalidation tracking: an unregistered entity's cache entries are
/// the host's concern, not this subsystem's.
pub(crate) fn record_flush(
    registry: &CoordinationRegistry,
    txn: &mut TransactionContext,
    dirty: &[DirtyInstance],
) -> Result<()> {
    for inst in dirty {
        if !registry.is_registered(&inst.entity) {
            continue;
        }

        for change in &inst.changes {
            if !registry.tracks(&inst.entity, &change.attribute) {
                continue;
            }

            let descriptor = inspect(&inst.entity, &change.attribute, &change.baseline, &change.current)?;
            let slot = SlotKey::new(inst.instance, change.attribute.clone());
            txn.ledger.absorb(slot, descriptor)?;
        }

        // Track for cache invalidation; a later flush may resolve the
        // primary key of an instance first seen pre-insert.
        let entry = txn
            .touched
            .entry(inst.instance)
            .or_insert_with(|| (inst.entity.clone(), None));
        if let Some(pk) = &inst.primary_key {
            entry.1 = Some(pk.clone());
        }
    }

    Ok(())
}

/// Shared after-commit preparation: consume the dispatch token, drain the
/// ledger, and build the operation plan. Returns `None` when this commit was
/// already dispatched or nothing is pending.
pub(crate) fn prepare_commit_dispatch(
    txn: &mut TransactionContext,
) -> Option<(Vec<SlotPlan>, Vec<PathBuf>)> {
    if matches!(txn.ledger.state(), LedgerState::Clean | LedgerState::Dirty) {
        if let Err(e) = txn.ledger.begin_commit() {
            log::warn!("Commit dispatch refused: {}", e);
            return None;
        }
    }

    if !txn.ledger.take_dispatch_token() {
        log::warn!("Duplicate commit hook invocation ignored: dispatch token already consumed");
        return None;
    }

    let drained = txn.ledger.drain();
    txn.ledger.mark_flushed();

    let staged = txn.take_staged_dirs();
    let plans = plan_operations(drained);

    if plans.is_empty() && staged.is_empty() {
        return None;
    }

    Some((plans, staged))
}

/// Shared after-rollback logic: discard every pending descriptor and release
/// staged temp content. Nothing was written to the backend pre-commit, so no
/// storage delete is needed; staging cleanup is best-effort and only logged.
pub(crate) fn discard_on_rollback(txn: &mut TransactionContext) {
    let discarded = txn.ledger.drain();
    txn.ledger.mark_discarded();
    txn.touched.clear();

    if !discarded.is_empty() {
        log::debug!(
            "Rolled back: discarded {} pending file change(s)",
            discarded.len()
        );
    }

    release_staged_dirs(&txn.take_staged_dirs());
}

/// Best-effort removal of staged temp directories.
pub(crate) fn release_staged_dirs(dirs: &[PathBuf]) {
    for dir in dirs {
        if !dir.exists() {
            continue;
        }
        if let Err(e) = std::fs::remove_dir_all(dir) {
            log::warn!("Failed to release staged dir {:?}: {}", dir, e);
        }
    }
}
