//! Remote account entity.

use serde::{Deserialize, Serialize};

use super::id::{EntityId, Handle};

/// Informational profile metadata. Never used for identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileMeta {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub public_repos: Option<u32>,
}

/// A remote account as materialized from one API response.
///
/// Equality considers the id only, so a renamed account (or a handle
/// returned with different casing) is still the same entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    id: EntityId,
    handle: Handle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    profile: Option<ProfileMeta>,
}

impl Entity {
    /// Create an entity without profile metadata.
    pub fn new(id: impl Into<EntityId>, handle: impl Into<Handle>) -> Self {
        Self {
            id: id.into(),
            handle: handle.into(),
            profile: None,
        }
    }

    /// Attach profile metadata.
    #[must_use]
    pub fn with_profile(mut self, profile: ProfileMeta) -> Self {
        self.profile = Some(profile);
        self
    }

    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    #[must_use]
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    #[must_use]
    pub fn profile(&self) -> Option<&ProfileMeta> {
        self.profile.as_ref()
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Entity {}

impl std::hash::Hash for Entity {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
