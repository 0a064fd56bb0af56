//! # tether-filestore
//!
//! Storage capability surface for the tether transaction coordinator.
//!
//! The coordination engine in `tether-core` only sequences storage calls; this
//! crate provides what it calls into:
//!
//! - **`StorageBackend`**: the save/delete/sign trait the coordinator drives
//! - **`ObjectStoreBackend`**: adapter over `object_store`, covering local
//!   filesystem, S3, GCS, and Azure behind one trait object
//! - **`StagingArea`**: local temp-dir staging for deferred upload content
//! - **`InMemoryBackend`**: operation-recording backend for tests
//! - **`sync_exec`**: helpers to drive storage futures to completion from
//!   blocking (non-async) call sites

pub mod backend;
pub mod error;
pub mod memory;
pub mod object_store_backend;
pub mod staging;
pub mod sync_exec;

pub use backend::{StorageBackend, StorageHandle};
pub use error::{FilestoreError, Result};
pub use memory::{InMemoryBackend, RecordedOp};
pub use object_store_backend::ObjectStoreBackend;
pub use staging::{StagedFile, StagingArea};
