//! Relationship classification.
//!
//! Partitions the following and followers sets into mutuals, non-mutuals
//! and follow-back candidates. Membership is decided by id only.

use serde::Serialize;

use super::entity::Entity;
use super::relation::RelationshipSet;

/// Read-only partition of the two relationship sets.
///
/// `mutual` and `non_mutual` keep the order of the following set;
/// `follow_back` keeps the order of the followers set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub mutual: Vec<Entity>,
    pub non_mutual: Vec<Entity>,
    pub follow_back: Vec<Entity>,
}

impl Classification {
    /// Number of entities in `following` (mutual + non-mutual).
    #[must_use]
    pub fn following_count(&self) -> usize {
        self.mutual.len() + self.non_mutual.len()
    }

    /// Number of entities in `followers` (mutual + follow-back).
    #[must_use]
    pub fn followers_count(&self) -> usize {
        self.mutual.len() + self.follow_back.len()
    }
}

/// Classify two relationship sets. Pure, O(n + m).
#[must_use]
pub fn classify(following: &RelationshipSet, followers: &RelationshipSet) -> Classification {
    let mut classification = Classification::default();

    for entity in following.iter() {
        if followers.contains(entity.id()) {
            classification.mutual.push(entity.clone());
        } else {
            classification.non_mutual.push(entity.clone());
        }
    }

    classification.follow_back = followers
        .iter()
        .filter(|entity| !following.contains(entity.id()))
        .cloned()
        .collect();

    classification
}
