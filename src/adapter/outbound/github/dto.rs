//! GitHub REST payloads.

use serde::Deserialize;

use crate::domain::{Entity, ProfileMeta};

/// A user record as returned by the list, `/users/{login}` and `/user`
/// endpoints. List entries omit the profile fields.
#[derive(Debug, Clone, Deserialize)]
pub struct UserDto {
    pub id: u64,
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub public_repos: Option<u32>,
}

impl UserDto {
    fn profile(&self) -> Option<ProfileMeta> {
        if self.name.is_none() && self.bio.is_none() && self.public_repos.is_none() {
            return None;
        }
        Some(ProfileMeta {
            name: self.name.clone(),
            bio: self.bio.clone(),
            public_repos: self.public_repos,
        })
    }
}

impl From<UserDto> for Entity {
    fn from(dto: UserDto) -> Self {
        let profile = dto.profile();
        let entity = Entity::new(dto.id, dto.login);
        match profile {
            Some(profile) => entity.with_profile(profile),
            None => entity,
        }
    }
}

/// Error body of a non-success response.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}
