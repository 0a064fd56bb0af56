//! Attribute change inspection.
//!
//! Pure functions computing a `ChangeDescriptor` for one file-valued
//! attribute relative to its last committed value. The baseline is always the
//! committed value: a slot that is set, cleared, and reset to the same file
//! within one transaction inspects as `NoChange`.

use crate::descriptor::ChangeDescriptor;
use crate::error::{CoordinatorError, Result};
use std::collections::HashSet;
use tether_commons::{AttributeName, EntityName, FileObject, FileValue};

/// Compute the change descriptor for one slot.
///
/// Fails with `CoordinatorError::Inspection` when the current value is
/// malformed: empty storage key, duplicate keys within one list, or a file
/// newly assigned in this transaction that carries no content to upload.
pub fn inspect(
    entity: &EntityName,
    attribute: &AttributeName,
    baseline: &FileValue,
    current: &FileValue,
) -> Result<ChangeDescriptor> {
    validate_current(entity, attribute, current)?;

    let descriptor = match (baseline, current) {
        (FileValue::Absent, FileValue::Absent) => ChangeDescriptor::NoChange,

        (FileValue::Absent, FileValue::Single(new)) => {
            require_content(entity, attribute, new)?;
            ChangeDescriptor::SingleSet { new: new.clone() }
        }

        (FileValue::Single(old), FileValue::Absent) => {
            ChangeDescriptor::SingleCleared { old: old.clone() }
        }

        (FileValue::Single(old), FileValue::Single(new)) => {
            if old.same_key(new) {
                ChangeDescriptor::NoChange
            } else {
                require_content(entity, attribute, new)?;
                ChangeDescriptor::SingleReplaced {
                    old: old.clone(),
                    new: new.clone(),
                }
            }
        }

        (FileValue::List(old), FileValue::List(new)) => {
            if old.token != new.token {
                // Wholesale reassignment declares a new complete set. An
                // element keyed like one in the old list is a carry-over of
                // an already stored object and needs no fresh content.
                for item in &new.items {
                    require_content_or_carry(entity, attribute, item, &old.items)?;
                }
                ChangeDescriptor::ListReplaced {
                    old_list: old.items.clone(),
                    new_list: new.items.clone(),
                }
            } else {
                let (added, removed) = set_difference(&old.items, &new.items);
                for item in &added {
                    require_content(entity, attribute, item)?;
                }
                if added.is_empty() && removed.is_empty() {
                    ChangeDescriptor::NoChange
                } else {
                    ChangeDescriptor::ListMutated { added, removed }
                }
            }
        }

        // Shape changes (single ↔ list) supersede the old value wholesale.
        (FileValue::Absent, FileValue::List(new)) => {
            for item in &new.items {
                require_content(entity, attribute, item)?;
            }
            ChangeDescriptor::ListMutated {
                added: new.items.clone(),
                removed: Vec::new(),
            }
        }
        (FileValue::List(old), FileValue::Absent) => ChangeDescriptor::ListMutated {
            added: Vec::new(),
            removed: old.items.clone(),
        },
        (FileValue::Single(old), FileValue::List(new)) => {
            for item in &new.items {
                require_content_or_carry(entity, attribute, item, std::slice::from_ref(old))?;
            }
            ChangeDescriptor::ListReplaced {
                old_list: vec![old.clone()],
                new_list: new.items.clone(),
            }
        }
        (FileValue::List(old), FileValue::Single(new)) => {
            require_content_or_carry(entity, attribute, new, &old.items)?;
            ChangeDescriptor::ListReplaced {
                old_list: old.items.clone(),
                new_list: vec![new.clone()],
            }
        }
    };

    Ok(descriptor)
}

/// Elements present only in `new` (added) and only in `old` (removed), keyed
/// by storage key. Elements present in both are untouched.
fn set_difference(old: &[FileObject], new: &[FileObject]) -> (Vec<FileObject>, Vec<FileObject>) {
    let old_keys: HashSet<&str> = old.iter().map(|f| f.storage_key.as_str()).collect();
    let new_keys: HashSet<&str> = new.iter().map(|f| f.storage_key.as_str()).collect();

    let added = new
        .iter()
        .filter(|f| !old_keys.contains(f.storage_key.as_str()))
        .cloned()
        .collect();
    let removed = old
        .iter()
        .filter(|f| !new_keys.contains(f.storage_key.as_str()))
        .cloned()
        .collect();

    (added, removed)
}

fn validate_current(
    entity: &EntityName,
    attribute: &AttributeName,
    current: &FileValue,
) -> Result<()> {
    match current {
        FileValue::Absent => Ok(()),
        FileValue::Single(file) => validate_key(entity, attribute, file),
        FileValue::List(list) => {
            let mut seen = HashSet::new();
            for file in &list.items {
                validate_key(entity, attribute, file)?;
                if !seen.insert(file.storage_key.as_str()) {
                    return Err(CoordinatorError::inspection(
                        entity,
                        attribute,
                        format!("duplicate storage key '{}' in file list", file.storage_key),
                    ));
                }
            }
            Ok(())
        }
    }
}

fn validate_key(entity: &EntityName, attribute: &AttributeName, file: &FileObject) -> Result<()> {
    if file.storage_key.trim().is_empty() {
        return Err(CoordinatorError::inspection(
            entity,
            attribute,
            "file object has an empty storage key",
        ));
    }
    Ok(())
}

/// A file entering the transaction must carry content: uploads are deferred
/// until commit, so there is nothing else to upload from.
fn require_content(
    entity: &EntityName,
    attribute: &AttributeName,
    file: &FileObject,
) -> Result<()> {
    if !file.has_content() {
        return Err(CoordinatorError::inspection(
            entity,
            attribute,
            format!("new file '{}' carries no content to upload", file.storage_key),
        ));
    }
    Ok(())
}

/// Like [`require_content`], but a content-less file keyed like an element of
/// the superseded value is accepted as a carry-over of the stored object.
fn require_content_or_carry(
    entity: &EntityName,
    attribute: &AttributeName,
    file: &FileObject,
    old: &[FileObject],
) -> Result<()> {
    if old.iter().any(|f| f.same_key(file)) {
        return Ok(());
    }
    require_content(entity, attribute, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tether_commons::ListToken;

    fn entity() -> EntityName {
        EntityName::from("Document")
    }

    fn attr() -> AttributeName {
        AttributeName::from("file")
    }

    fn pending(key: &str) -> FileObject {
        FileObject::from_bytes(key, key, "application/octet-stream", Bytes::from("data"))
    }

    fn committed(key: &str) -> FileObject {
        FileObject::committed(key, key, "application/octet-stream", 4, "sha")
    }

    #[test]
    fn test_absent_to_set() {
        let d = inspect(
            &entity(),
            &attr(),
            &FileValue::Absent,
            &FileValue::single(pending("a")),
        )
        .unwrap();
        assert!(matches!(d, ChangeDescriptor::SingleSet { new } if new.storage_key == "a"));
    }

    #[test]
    fn test_set_to_absent() {
        let d = inspect(
            &entity(),
            &attr(),
            &FileValue::single(committed("a")),
            &FileValue::Absent,
        )
        .unwrap();
        assert!(matches!(d, ChangeDescriptor::SingleCleared { old } if old.storage_key == "a"));
    }

    #[test]
    fn test_replacement() {
        let d = inspect(
            &entity(),
            &attr(),
            &FileValue::single(committed("a")),
            &FileValue::single(pending("b")),
        )
        .unwrap();
        match d {
            ChangeDescriptor::SingleReplaced { old, new } => {
                assert_eq!(old.storage_key, "a");
                assert_eq!(new.storage_key, "b");
            }
            other => panic!("Expected SingleReplaced, got {:?}", other),
        }
    }

    #[test]
    fn test_oscillation_back_to_baseline_is_no_change() {
        // set → cleared → reset to the same committed file: inspection only
        // ever sees (baseline, latest current).
        let d = inspect(
            &entity(),
            &attr(),
            &FileValue::single(committed("a")),
            &FileValue::single(committed("a")),
        )
        .unwrap();
        assert!(d.is_no_change());
    }

    #[test]
    fn test_list_in_place_mutation_is_set_difference() {
        let token = ListToken::new(1);
        let baseline = FileValue::list(token, vec![committed("a"), committed("b")]);
        let current = FileValue::list(token, vec![committed("a"), pending("c")]);

        let d = inspect(&entity(), &attr(), &baseline, &current).unwrap();
        match d {
            ChangeDescriptor::ListMutated { added, removed } => {
                assert_eq!(added.len(), 1);
                assert_eq!(added[0].storage_key, "c");
                assert_eq!(removed.len(), 1);
                assert_eq!(removed[0].storage_key, "b");
            }
            other => panic!("Expected ListMutated, got {:?}", other),
        }
    }

    #[test]
    fn test_list_reassignment_replaces_wholesale_even_when_equal() {
        let baseline = FileValue::list(ListToken::new(1), vec![committed("a")]);
        // Value-equal contents but a new list object, carrying fresh pending
        // elements, as reassignment always supplies.
        let current = FileValue::list(ListToken::new(2), vec![pending("a2")]);

        let d = inspect(&entity(), &attr(), &baseline, &current).unwrap();
        match d {
            ChangeDescriptor::ListReplaced { old_list, new_list } => {
                assert_eq!(old_list.len(), 1);
                assert_eq!(new_list.len(), 1);
            }
            other => panic!("Expected ListReplaced, got {:?}", other),
        }
    }

    #[test]
    fn test_list_reassignment_accepts_committed_carry_over() {
        // Reassigning a value-equal list carries the committed elements over
        // by key; content-less references must not fail inspection.
        let baseline = FileValue::list(ListToken::new(1), vec![committed("a"), committed("b")]);
        let current = FileValue::list(ListToken::new(2), vec![committed("a"), committed("b")]);

        let d = inspect(&entity(), &attr(), &baseline, &current).unwrap();
        match d {
            ChangeDescriptor::ListReplaced { old_list, new_list } => {
                assert_eq!(old_list.len(), 2);
                assert_eq!(new_list.len(), 2);
            }
            other => panic!("Expected ListReplaced, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_keys_in_list_fail_inspection() {
        let current = FileValue::list(ListToken::new(1), vec![pending("a"), pending("a")]);
        let err = inspect(&entity(), &attr(), &FileValue::Absent, &current).unwrap_err();
        assert!(matches!(err, CoordinatorError::Inspection { .. }));
    }

    #[test]
    fn test_empty_storage_key_fails_inspection() {
        let current = FileValue::single(pending(" "));
        let err = inspect(&entity(), &attr(), &FileValue::Absent, &current).unwrap_err();
        assert!(matches!(err, CoordinatorError::Inspection { .. }));
    }

    #[test]
    fn test_new_file_without_content_fails_inspection() {
        let current = FileValue::single(committed("a"));
        let err = inspect(&entity(), &attr(), &FileValue::Absent, &current).unwrap_err();
        assert!(matches!(err, CoordinatorError::Inspection { .. }));
    }
}
