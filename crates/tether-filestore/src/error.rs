//! Error types for tether-filestore

use thiserror::Error;

/// Errors that can occur in storage operations
#[derive(Error, Debug)]
pub enum FilestoreError {
    #[error("Object store error: {0}")]
    ObjectStore(String),

    #[error("Staging error: {0}")]
    Staging(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing content for '{0}': nothing to upload")]
    MissingContent(String),

    #[error("Other error: {0}")]
    Other(String),
}

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, FilestoreError>;
