//! Error types for tether-core

use thiserror::Error;

/// Errors that can occur in coordination operations
#[derive(Error, Debug)]
pub enum CoordinatorError {
    /// Malformed attribute value detected during before-flush. Fatal to the
    /// flush: the transaction has not committed yet and must not.
    #[error("Inspection failed for {entity}.{attribute}: {reason}")]
    Inspection {
        entity: String,
        attribute: String,
        reason: String,
    },

    /// The ledger no longer accepts changes (commit already began).
    #[error("Ledger closed to new changes: {0}")]
    LedgerClosed(String),

    /// Invalid transaction state transition.
    #[error("Invalid transaction state: {0}")]
    InvalidState(String),

    #[error("Storage error: {0}")]
    Storage(#[from] tether_filestore::FilestoreError),

    #[error("Other error: {0}")]
    Other(String),
}

impl CoordinatorError {
    pub(crate) fn inspection(
        entity: &tether_commons::EntityName,
        attribute: &tether_commons::AttributeName,
        reason: impl Into<String>,
    ) -> Self {
        Self::Inspection {
            entity: entity.as_str().to_string(),
            attribute: attribute.as_str().to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for coordination operations
pub type Result<T> = std::result::Result<T, CoordinatorError>;
