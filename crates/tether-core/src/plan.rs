//! Translation of drained descriptors into ordered storage operations.
//!
//! Ordering contract, per slot: uploads are dispatched strictly before the
//! deletes they supersede, so a mid-sequence failure never leaves the
//! committed row referencing a file that no longer exists. A failed upload
//! cancels that slot's paired deletes; independent slots proceed regardless.

use crate::descriptor::{ChangeDescriptor, PendingOperation};
use std::collections::HashSet;
use tether_commons::{FileObject, SlotKey};
use tether_filestore::{StorageBackend, StorageHandle};

/// Ordered operations for one slot: all uploads, then all deletes.
#[derive(Debug)]
pub struct SlotPlan {
    pub slot: SlotKey,
    pub uploads: Vec<FileObject>,
    pub deletes: Vec<FileObject>,
}

impl SlotPlan {
    /// The slot's pending operations in dispatch order.
    pub fn operations(&self) -> Vec<PendingOperation> {
        self.uploads
            .iter()
            .cloned()
            .map(PendingOperation::Upload)
            .chain(self.deletes.iter().cloned().map(PendingOperation::Delete))
            .collect()
    }
}

/// Translate drained ledger entries into per-slot operation plans.
///
/// A delete whose storage key is also being uploaded in the same slot is
/// dropped: the upload overwrites in place, and deleting afterwards would
/// leave the row referencing a missing object.
pub fn plan_operations(drained: Vec<(SlotKey, ChangeDescriptor)>) -> Vec<SlotPlan> {
    let mut plans = Vec::with_capacity(drained.len());

    for (slot, descriptor) in drained {
        let (uploads, deletes) = match descriptor {
            ChangeDescriptor::NoChange => continue,
            ChangeDescriptor::SingleSet { new } => (vec![new], vec![]),
            ChangeDescriptor::SingleCleared { old } => (vec![], vec![old]),
            ChangeDescriptor::SingleReplaced { old, new } => (vec![new], vec![old]),
            ChangeDescriptor::ListMutated { added, removed } => (added, removed),
            ChangeDescriptor::ListReplaced { old_list, new_list } => {
                // A content-less element carried over by key keeps its stored
                // object: nothing to upload, and the kept key is never deleted.
                let kept: HashSet<String> =
                    new_list.iter().map(|f| f.storage_key.clone()).collect();
                let uploads = new_list.into_iter().filter(FileObject::has_content).collect();
                let deletes = old_list
                    .into_iter()
                    .filter(|f| !kept.contains(&f.storage_key))
                    .collect();
                (uploads, deletes)
            }
        };

        let upload_keys: HashSet<String> =
            uploads.iter().map(|f| f.storage_key.clone()).collect();
        let deletes = deletes
            .into_iter()
            .filter(|f| !upload_keys.contains(&f.storage_key))
            .collect();

        if let Some(plan) = non_empty(SlotPlan { slot, uploads, deletes }) {
            plans.push(plan);
        }
    }

    plans
}

fn non_empty(plan: SlotPlan) -> Option<SlotPlan> {
    if plan.uploads.is_empty() && plan.deletes.is_empty() {
        None
    } else {
        Some(plan)
    }
}

/// Execute the plans against the storage backend.
///
/// Runs post-commit: failures are logged and never raised; the transaction
/// is already durable and there is nothing left to fail. One slot's failure
/// does not block the rest of the batch.
pub async fn execute_plans(storage: &dyn StorageBackend, plans: Vec<SlotPlan>) {
    for plan in plans {
        let mut upload_failed = false;

        for op in plan.operations() {
            match op {
                PendingOperation::Upload(file) => match storage.save(&file).await {
                    Ok(handle) => {
                        log::debug!("Uploaded '{}' for {}", handle, plan.slot);
                    }
                    Err(e) => {
                        log::error!(
                            "Upload of '{}' for {} failed: {}",
                            file.storage_key,
                            plan.slot,
                            e
                        );
                        upload_failed = true;
                    }
                },
                PendingOperation::Delete(file) => {
                    if upload_failed {
                        // The row now references the replacement; deleting
                        // what it may still be served from would make things
                        // worse. Reconciliation is external.
                        log::warn!(
                            "Skipping delete of '{}' for {}: paired upload failed",
                            file.storage_key,
                            plan.slot
                        );
                        continue;
                    }
                    if let Err(e) = storage.delete(&StorageHandle::new(&file.storage_key)).await {
                        log::error!(
                            "Delete of superseded '{}' for {} failed: {}",
                            file.storage_key,
                            plan.slot,
                            e
                        );
                    } else {
                        log::debug!(
                            "Deleted superseded '{}' for {}",
                            file.storage_key,
                            plan.slot
                        );
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tether_commons::InstanceId;
    use tether_filestore::{InMemoryBackend, RecordedOp};

    fn slot(n: u64) -> SlotKey {
        SlotKey::new(InstanceId::new(n), "file")
    }

    fn pending(key: &str) -> FileObject {
        FileObject::from_bytes(key, key, "application/octet-stream", Bytes::from("x"))
    }

    fn committed(key: &str) -> FileObject {
        FileObject::committed(key, key, "application/octet-stream", 1, "sha")
    }

    #[test]
    fn test_replacement_plans_upload_before_delete() {
        let plans = plan_operations(vec![(
            slot(1),
            ChangeDescriptor::SingleReplaced {
                old: committed("old"),
                new: pending("new"),
            },
        )]);

        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].uploads[0].storage_key, "new");
        assert_eq!(plans[0].deletes[0].storage_key, "old");
    }

    #[test]
    fn test_same_key_overwrite_drops_the_delete() {
        let plans = plan_operations(vec![(
            slot(1),
            ChangeDescriptor::ListReplaced {
                old_list: vec![committed("a"), committed("b")],
                new_list: vec![pending("a"), pending("c")],
            },
        )]);

        assert_eq!(plans[0].uploads.len(), 2);
        assert_eq!(plans[0].deletes.len(), 1);
        assert_eq!(plans[0].deletes[0].storage_key, "b");
    }

    #[test]
    fn test_value_equal_reassignment_plans_nothing() {
        let plans = plan_operations(vec![(
            slot(1),
            ChangeDescriptor::ListReplaced {
                old_list: vec![committed("a"), committed("b")],
                new_list: vec![committed("a"), committed("b")],
            },
        )]);

        assert!(plans.is_empty());
    }

    #[test]
    fn test_reassignment_with_carry_over_touches_only_the_delta() {
        let plans = plan_operations(vec![(
            slot(1),
            ChangeDescriptor::ListReplaced {
                old_list: vec![committed("a"), committed("b")],
                new_list: vec![committed("a"), pending("c")],
            },
        )]);

        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].uploads.len(), 1);
        assert_eq!(plans[0].uploads[0].storage_key, "c");
        assert_eq!(plans[0].deletes.len(), 1);
        assert_eq!(plans[0].deletes[0].storage_key, "b");
    }

    #[test]
    fn test_operations_are_in_dispatch_order() {
        let plans = plan_operations(vec![(
            slot(1),
            ChangeDescriptor::SingleReplaced {
                old: committed("old"),
                new: pending("new"),
            },
        )]);

        let ops = plans[0].operations();
        let keys: Vec<&str> = ops.iter().map(|op| op.storage_key()).collect();
        assert_eq!(keys, vec!["new", "old"]);
        assert!(matches!(ops[0], PendingOperation::Upload(_)));
        assert!(matches!(ops[1], PendingOperation::Delete(_)));
    }

    #[tokio::test]
    async fn test_execute_orders_uploads_before_deletes() {
        let backend = InMemoryBackend::new();
        let plans = plan_operations(vec![(
            slot(1),
            ChangeDescriptor::SingleReplaced {
                old: committed("old"),
                new: pending("new"),
            },
        )]);

        execute_plans(&backend, plans).await;

        assert_eq!(
            backend.ops(),
            vec![
                RecordedOp::Save("new".into()),
                RecordedOp::Delete("old".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_upload_skips_paired_deletes_only() {
        let backend = InMemoryBackend::new();
        backend.fail_save_on("s1-new");

        let plans = plan_operations(vec![
            (
                slot(1),
                ChangeDescriptor::SingleReplaced {
                    old: committed("s1-old"),
                    new: pending("s1-new"),
                },
            ),
            (
                slot(2),
                ChangeDescriptor::SingleReplaced {
                    old: committed("s2-old"),
                    new: pending("s2-new"),
                },
            ),
        ]);

        execute_plans(&backend, plans).await;

        let ops = backend.ops();
        // Slot 1's delete was skipped; slot 2 proceeded in full.
        assert!(!ops.contains(&RecordedOp::Delete("s1-old".into())));
        assert!(ops.contains(&RecordedOp::Save("s2-new".into())));
        assert!(ops.contains(&RecordedOp::Delete("s2-old".into())));
    }
}
