//! Type-safe identifier wrappers used throughout the coordinator.
//!
//! Newtype wrappers keep entity names, attribute names, and in-memory
//! identity tokens from being confused with one another at call sites.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type-safe wrapper for an entity type name (e.g. `"Document"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityName(String);

impl EntityName {
    /// Create a new EntityName from a string
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the entity name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Type-safe wrapper for a file-valued attribute name (e.g. `"cover_image"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeName(String);

impl AttributeName {
    /// Create a new AttributeName from a string
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the attribute name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AttributeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AttributeName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AttributeName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// In-memory identity of a managed entity instance.
///
/// The host session issues one token per tracked instance. Identity is
/// deliberately not the primary key: freshly created instances do not have a
/// primary key assigned until they have been flushed, but they must be
/// trackable from the first mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(u64);

impl InstanceId {
    pub fn new(token: u64) -> Self {
        Self(token)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// In-memory identity of a list value.
///
/// A list attribute that is reassigned wholesale carries a new token even when
/// the new list is element-for-element equal to the old one; mutating a list
/// in place keeps its token. The change inspector uses this to tell the two
/// cases apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListToken(u64);

impl ListToken {
    pub fn new(token: u64) -> Self {
        Self(token)
    }
}

/// The unit of change tracking: one file-valued attribute on one instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub instance: InstanceId,
    pub attribute: AttributeName,
}

impl SlotKey {
    pub fn new(instance: InstanceId, attribute: impl Into<AttributeName>) -> Self {
        Self {
            instance,
            attribute: attribute.into(),
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.instance, self.attribute)
    }
}

/// Cache address derived from entity type and resolved primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub entity: EntityName,
    pub primary_key: String,
}

impl CacheKey {
    pub fn new(entity: EntityName, primary_key: impl Into<String>) -> Self {
        Self {
            entity,
            primary_key: primary_key.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity, self.primary_key)
    }
}
