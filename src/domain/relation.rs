//! Relationship sets reconstructed from paginated list endpoints.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::Entity;
use super::id::EntityId;

/// Which side of the follow graph a set describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    /// Accounts the authenticated user follows.
    Following,
    /// Accounts following the authenticated user.
    Followers,
}

impl RelationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Following => "following",
            Self::Followers => "followers",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable, id-deduplicated set of entities captured at one fetch instant.
///
/// Iteration follows the order in which entities were first seen, so
/// partitions derived from a set are reproducible for the same input.
#[derive(Debug, Clone, Serialize)]
pub struct RelationshipSet {
    kind: RelationKind,
    entities: Vec<Entity>,
    #[serde(skip)]
    index: HashSet<EntityId>,
    fetched_at: DateTime<Utc>,
}

impl RelationshipSet {
    /// Build a set from an iterator, dropping repeated ids.
    pub fn from_entities(kind: RelationKind, entities: impl IntoIterator<Item = Entity>) -> Self {
        let mut builder = RelationshipSetBuilder::new(kind);
        builder.extend(entities);
        builder.finish()
    }

    #[must_use]
    pub const fn kind(&self) -> RelationKind {
        self.kind
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// O(1) membership test by id.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    #[must_use]
    pub const fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }
}

/// Accumulator used while pages are being fetched.
#[derive(Debug)]
pub struct RelationshipSetBuilder {
    kind: RelationKind,
    entities: Vec<Entity>,
    index: HashSet<EntityId>,
    duplicates: usize,
}

impl RelationshipSetBuilder {
    #[must_use]
    pub fn new(kind: RelationKind) -> Self {
        Self {
            kind,
            entities: Vec::new(),
            index: HashSet::new(),
            duplicates: 0,
        }
    }

    /// Insert an entity. Returns `false` when the id was already present.
    pub fn insert(&mut self, entity: Entity) -> bool {
        if self.index.insert(entity.id()) {
            self.entities.push(entity);
            true
        } else {
            self.duplicates += 1;
            false
        }
    }

    /// Number of entries dropped because their id was already present.
    #[must_use]
    pub const fn duplicates(&self) -> usize {
        self.duplicates
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    #[must_use]
    pub fn finish(self) -> RelationshipSet {
        RelationshipSet {
            kind: self.kind,
            entities: self.entities,
            index: self.index,
            fetched_at: Utc::now(),
        }
    }
}

impl Extend<Entity> for RelationshipSetBuilder {
    fn extend<T: IntoIterator<Item = Entity>>(&mut self, iter: T) {
        for entity in iter {
            self.insert(entity);
        }
    }
}
