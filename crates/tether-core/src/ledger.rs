//! Per-transaction pending operation ledger.
//!
//! One ledger per active transaction, owned by its `TransactionContext` and
//! never shared across transactions. The ORM may flush several times before
//! committing; each flush `absorb`s freshly inspected descriptors, merging
//! them idempotently so the ledger always holds at most one descriptor per
//! slot. At transaction end the ledger is drained exactly once.

use crate::descriptor::ChangeDescriptor;
use crate::error::{CoordinatorError, Result};
use std::collections::HashMap;
use tether_commons::SlotKey;

/// Per-transaction ledger state.
///
/// `Clean → Dirty (first absorb) → Committing → {Flushed | Discarded} →
/// Closed`. No absorb is accepted once `Committing` has begun.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerState {
    Clean,
    Dirty,
    Committing,
    Flushed,
    Discarded,
    Closed,
}

/// Accumulator mapping slots to their latest merged change descriptor.
#[derive(Debug)]
pub struct Ledger {
    entries: HashMap<SlotKey, ChangeDescriptor>,
    state: LedgerState,
    dispatch_token: bool,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            state: LedgerState::Clean,
            dispatch_token: true,
        }
    }

    pub fn state(&self) -> LedgerState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge a freshly inspected descriptor into the slot's existing entry.
    ///
    /// Absorbing a descriptor that nets out to no change removes the slot's
    /// entry: an element appended and removed again before commit leaves no
    /// trace. Rejected once commit has begun.
    pub fn absorb(&mut self, slot: SlotKey, descriptor: ChangeDescriptor) -> Result<()> {
        match self.state {
            LedgerState::Clean | LedgerState::Dirty => {}
            state => {
                return Err(CoordinatorError::LedgerClosed(format!(
                    "cannot absorb changes for {} in state {:?}",
                    slot, state
                )))
            }
        }

        if descriptor.is_no_change() && !self.entries.contains_key(&slot) {
            return Ok(());
        }

        self.state = LedgerState::Dirty;

        let merged = match self.entries.remove(&slot) {
            Some(existing) => merge(existing, descriptor),
            None => descriptor,
        };

        if !merged.is_no_change() {
            self.entries.insert(slot, merged);
        }

        Ok(())
    }

    /// Enter the commit phase; no further absorb is accepted.
    pub fn begin_commit(&mut self) -> Result<()> {
        match self.state {
            LedgerState::Clean | LedgerState::Dirty => {
                self.state = LedgerState::Committing;
                Ok(())
            }
            state => Err(CoordinatorError::InvalidState(format!(
                "cannot begin commit from {:?}",
                state
            ))),
        }
    }

    /// Consume the at-most-once dispatch token.
    ///
    /// Defends against a lifecycle hook firing more than once for the same
    /// commit: only the first caller gets `true`.
    pub fn take_dispatch_token(&mut self) -> bool {
        std::mem::take(&mut self.dispatch_token)
    }

    /// Empty the ledger, returning all entries in stable slot order.
    pub fn drain(&mut self) -> Vec<(SlotKey, ChangeDescriptor)> {
        let mut drained: Vec<_> = self.entries.drain().collect();
        drained.sort_by(|(a, _), (b, _)| {
            (a.instance, a.attribute.as_str()).cmp(&(b.instance, b.attribute.as_str()))
        });
        drained
    }

    pub fn mark_flushed(&mut self) {
        self.state = LedgerState::Flushed;
    }

    pub fn mark_discarded(&mut self) {
        self.state = LedgerState::Discarded;
    }

    pub fn close(&mut self) {
        self.state = LedgerState::Closed;
    }
}

/// Merge an existing descriptor with a newer one for the same slot.
///
/// Newer descriptors are baseline-anchored (the inspector always compares
/// against the committed value), so each one is already cumulative and the
/// newer one is authoritative. The merge only folds in what the earlier one
/// knew that must survive: the earliest committed `old` for single-valued
/// slots, so that a value first seen uncommitted in this transaction never
/// produces a delete.
fn merge(existing: ChangeDescriptor, newer: ChangeDescriptor) -> ChangeDescriptor {
    use ChangeDescriptor::*;

    match (existing, newer) {
        (_, NoChange) => NoChange,

        // The earliest committed old survives; the latest new wins. An old
        // value that was never committed (first seen as SingleSet) never
        // produces a delete.
        (SingleReplaced { old, .. }, SingleReplaced { new, .. }) => SingleReplaced { old, new },
        (SingleReplaced { old, .. }, SingleSet { new }) => SingleReplaced { old, new },
        (SingleReplaced { old, .. }, SingleCleared { .. }) => SingleCleared { old },
        (SingleCleared { old }, SingleReplaced { new, .. }) => SingleReplaced { old, new },
        (SingleCleared { old }, SingleSet { new }) => SingleReplaced { old, new },
        (SingleSet { .. }, SingleSet { new }) => SingleSet { new },
        (SingleSet { .. }, SingleReplaced { new, .. }) => SingleSet { new },
        (SingleSet { .. }, SingleCleared { .. }) => NoChange,

        // The later mutation already accounts for everything the earlier one
        // saw: an element appended and dropped again before commit simply
        // stops appearing in `added`. Unioning here would resurrect it.
        (ListMutated { .. }, newer @ ListMutated { .. }) => newer,

        // Wholesale reassignment keeps the earliest old list; a later
        // reassignment only refreshes the new side.
        (ListReplaced { old_list, .. }, ListReplaced { new_list, .. }) => {
            ListReplaced { old_list, new_list }
        }

        // Cross-shape merges: the newer, baseline-anchored descriptor is the
        // truth.
        (_, newer) => newer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tether_commons::{FileObject, InstanceId};

    fn slot() -> SlotKey {
        SlotKey::new(InstanceId::new(1), "file")
    }

    fn pending(key: &str) -> FileObject {
        FileObject::from_bytes(key, key, "application/octet-stream", Bytes::from("x"))
    }

    fn committed(key: &str) -> FileObject {
        FileObject::committed(key, key, "application/octet-stream", 1, "sha")
    }

    #[test]
    fn test_reflush_merges_to_latest_new() {
        let mut ledger = Ledger::new();
        ledger
            .absorb(slot(), ChangeDescriptor::SingleSet { new: pending("a") })
            .unwrap();
        ledger
            .absorb(slot(), ChangeDescriptor::SingleSet { new: pending("b") })
            .unwrap();

        assert_eq!(ledger.len(), 1);
        let drained = ledger.drain();
        assert!(
            matches!(&drained[0].1, ChangeDescriptor::SingleSet { new } if new.storage_key == "b")
        );
    }

    #[test]
    fn test_never_committed_old_never_deletes() {
        // First flush saw set-to-A; before commit the host reassigned to B
        // and a second flush reported a replacement. A was
        // never committed, so it must not surface as a delete target.
        let mut ledger = Ledger::new();
        ledger
            .absorb(slot(), ChangeDescriptor::SingleSet { new: pending("a") })
            .unwrap();
        ledger
            .absorb(
                slot(),
                ChangeDescriptor::SingleReplaced {
                    old: pending("a"),
                    new: pending("b"),
                },
            )
            .unwrap();

        let drained = ledger.drain();
        assert!(
            matches!(&drained[0].1, ChangeDescriptor::SingleSet { new } if new.storage_key == "b")
        );
    }

    #[test]
    fn test_replacement_chain_keeps_earliest_old() {
        let mut ledger = Ledger::new();
        ledger
            .absorb(
                slot(),
                ChangeDescriptor::SingleReplaced {
                    old: committed("a"),
                    new: pending("b"),
                },
            )
            .unwrap();
        ledger
            .absorb(
                slot(),
                ChangeDescriptor::SingleReplaced {
                    old: committed("a"),
                    new: pending("c"),
                },
            )
            .unwrap();

        let drained = ledger.drain();
        match &drained[0].1 {
            ChangeDescriptor::SingleReplaced { old, new } => {
                assert_eq!(old.storage_key, "a");
                assert_eq!(new.storage_key, "c");
            }
            other => panic!("Expected SingleReplaced, got {:?}", other),
        }
    }

    #[test]
    fn test_add_then_remove_cancels() {
        // Appended x, then dropped it again: the second flush compares the
        // current list against the committed baseline and reports no change.
        let mut ledger = Ledger::new();
        ledger
            .absorb(
                slot(),
                ChangeDescriptor::ListMutated {
                    added: vec![pending("x")],
                    removed: vec![],
                },
            )
            .unwrap();
        ledger.absorb(slot(), ChangeDescriptor::NoChange).unwrap();

        assert!(ledger.is_empty());
    }

    #[test]
    fn test_list_reflush_supersedes_earlier_mutation() {
        // Appended x, dropped it, appended y instead. Each descriptor is
        // cumulative against the committed baseline, so the later one is the
        // whole truth and x must not resurface.
        let mut ledger = Ledger::new();
        ledger
            .absorb(
                slot(),
                ChangeDescriptor::ListMutated {
                    added: vec![pending("x")],
                    removed: vec![],
                },
            )
            .unwrap();
        ledger
            .absorb(
                slot(),
                ChangeDescriptor::ListMutated {
                    added: vec![pending("y")],
                    removed: vec![],
                },
            )
            .unwrap();

        let drained = ledger.drain();
        match &drained[0].1 {
            ChangeDescriptor::ListMutated { added, removed } => {
                assert_eq!(added.len(), 1);
                assert_eq!(added[0].storage_key, "y");
                assert!(removed.is_empty());
            }
            other => panic!("Expected ListMutated, got {:?}", other),
        }
    }

    #[test]
    fn test_oscillation_to_no_change_removes_entry() {
        let mut ledger = Ledger::new();
        ledger
            .absorb(slot(), ChangeDescriptor::SingleSet { new: pending("a") })
            .unwrap();
        ledger.absorb(slot(), ChangeDescriptor::NoChange).unwrap();

        assert!(ledger.is_empty());
        assert_eq!(ledger.state(), LedgerState::Dirty);
    }

    #[test]
    fn test_absorb_rejected_after_commit_begins() {
        let mut ledger = Ledger::new();
        ledger
            .absorb(slot(), ChangeDescriptor::SingleSet { new: pending("a") })
            .unwrap();
        ledger.begin_commit().unwrap();

        let err = ledger
            .absorb(slot(), ChangeDescriptor::SingleSet { new: pending("b") })
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::LedgerClosed(_)));
    }

    #[test]
    fn test_dispatch_token_consumed_once() {
        let mut ledger = Ledger::new();
        assert!(ledger.take_dispatch_token());
        assert!(!ledger.take_dispatch_token());
    }

    #[test]
    fn test_drain_is_exhaustive_and_ordered() {
        let mut ledger = Ledger::new();
        for i in (0..4).rev() {
            ledger
                .absorb(
                    SlotKey::new(InstanceId::new(i), "file"),
                    ChangeDescriptor::SingleSet {
                        new: pending(&format!("k{}", i)),
                    },
                )
                .unwrap();
        }

        let drained = ledger.drain();
        assert_eq!(drained.len(), 4);
        let instances: Vec<u64> = drained.iter().map(|(s, _)| s.instance.get()).collect();
        assert_eq!(instances, vec![0, 1, 2, 3]);
        assert!(ledger.is_empty());
        assert!(ledger.drain().is_empty());
    }

    #[test]
    fn test_state_machine_paths() {
        let mut ledger = Ledger::new();
        assert_eq!(ledger.state(), LedgerState::Clean);

        ledger
            .absorb(slot(), ChangeDescriptor::SingleSet { new: pending("a") })
            .unwrap();
        assert_eq!(ledger.state(), LedgerState::Dirty);

        ledger.begin_commit().unwrap();
        assert_eq!(ledger.state(), LedgerState::Committing);
        assert!(ledger.begin_commit().is_err());

        ledger.mark_flushed();
        assert_eq!(ledger.state(), LedgerState::Flushed);

        ledger.close();
        assert_eq!(ledger.state(), LedgerState::Closed);
    }
}
