//! Opt-in registry of entity types and attributes participating in
//! coordination.
//!
//! Entities and attributes never registered here are invisible to the
//! before-flush inspection. Lock-free concurrent access via `DashMap`; the
//! registry is shared by both coordinator variants of one session factory.

use dashmap::DashMap;
use std::collections::HashSet;
use tether_commons::{AttributeName, EntityName};

/// Registry of `(entity type → file-valued attributes)` under coordination.
#[derive(Debug, Default)]
pub struct CoordinationRegistry {
    entities: DashMap<EntityName, HashSet<AttributeName>>,
}

impl CoordinationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity type with the file attributes to coordinate.
    /// Registering again extends the attribute set.
    pub fn register<I, A>(&self, entity: EntityName, attributes: I)
    where
        I: IntoIterator<Item = A>,
        A: Into<AttributeName>,
    {
        let mut entry = self.entities.entry(entity).or_default();
        entry.extend(attributes.into_iter().map(Into::into));
    }

    /// Whether the entity type participates at all.
    pub fn is_registered(&self, entity: &EntityName) -> bool {
        self.entities.contains_key(entity)
    }

    /// Whether a specific attribute of the entity is coordinated.
    pub fn tracks(&self, entity: &EntityName, attribute: &AttributeName) -> bool {
        self.entities
            .get(entity)
            .map(|attrs| attrs.contains(attribute))
            .unwrap_or(false)
    }

    /// Number of registered entity types.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
