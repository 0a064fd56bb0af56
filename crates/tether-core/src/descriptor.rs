//! Change descriptors and the pending operations they translate into.

use tether_commons::FileObject;

/// What happened to one file-valued attribute relative to its committed
/// baseline.
///
/// Descriptors are always anchored to the committed baseline, never to an
/// intermediate in-transaction value, so repeated flushes and oscillating
/// assignments collapse naturally.
#[derive(Debug, Clone)]
pub enum ChangeDescriptor {
    /// Attribute equals its baseline.
    NoChange,

    /// absent → file
    SingleSet { new: FileObject },

    /// file → absent
    SingleCleared { old: FileObject },

    /// file → different file
    SingleReplaced { old: FileObject, new: FileObject },

    /// Same list object, elements added/removed in place (set difference).
    ListMutated {
        added: Vec<FileObject>,
        removed: Vec<FileObject>,
    },

    /// The list object itself was reassigned: the old list is superseded by
    /// the new list wholesale. Elements keyed like old ones are carried over
    /// in place; only genuinely new elements are uploaded.
    ListReplaced {
        old_list: Vec<FileObject>,
        new_list: Vec<FileObject>,
    },
}

impl ChangeDescriptor {
    pub fn is_no_change(&self) -> bool {
        match self {
            Self::NoChange => true,
            Self::ListMutated { added, removed } => added.is_empty() && removed.is_empty(),
            _ => false,
        }
    }
}

/// One storage call scheduled at commit. Idempotent at the backend: deleting
/// an absent object is a no-op.
#[derive(Debug, Clone)]
pub enum PendingOperation {
    Upload(FileObject),
    Delete(FileObject),
}

impl PendingOperation {
    pub fn storage_key(&self) -> &str {
        match self {
            Self::Upload(f) | Self::Delete(f) => &f.storage_key,
        }
    }
}
