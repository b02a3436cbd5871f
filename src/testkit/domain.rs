//! Builders for domain values used across tests.

use std::ops::RangeInclusive;

use crate::domain::{Entity, Handle, RelationKind, RelationshipSet};

/// Entities with ids from `ids` and handles `user{id}`.
pub fn entities(ids: RangeInclusive<u64>) -> Vec<Entity> {
    ids.map(|id| Entity::new(id, format!("user{id}"))).collect()
}

/// A single entity with an explicit handle.
pub fn entity(id: u64, handle: &str) -> Entity {
    Entity::new(id, handle)
}

pub fn handles(names: &[&str]) -> Vec<Handle> {
    names.iter().map(|n| Handle::new(*n)).collect()
}

/// A relationship set over `user{id}` entities.
pub fn set(kind: RelationKind, ids: impl IntoIterator<Item = u64>) -> RelationshipSet {
    RelationshipSet::from_entities(
        kind,
        ids.into_iter().map(|id| Entity::new(id, format!("user{id}"))),
    )
}
