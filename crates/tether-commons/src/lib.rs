//! # tether-commons
//!
//! Shared value types for the tether transaction-side-effect coordinator.
//!
//! This crate holds the data model that flows between the session-facing
//! coordination engine (`tether-core`) and the storage surface
//! (`tether-filestore`):
//!
//! - Type-safe identifier newtypes (`EntityName`, `AttributeName`,
//!   `InstanceId`, `ListToken`)
//! - The change-tracking unit `SlotKey` and cache addressing via `CacheKey`
//! - The immutable `FileObject` value object and the `FileValue` attribute
//!   shapes it appears in

pub mod file_object;
pub mod ids;

pub use file_object::{FileContent, FileList, FileObject, FileValue};
pub use ids::{AttributeName, CacheKey, EntityName, InstanceId, ListToken, SlotKey};
