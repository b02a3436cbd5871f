//! In-memory [`GraphApi`] for tests.
//!
//! [`ScriptedApi`] serves relationship listings from fixed entity lists,
//! answers mutations from per-handle scripts (defaulting to `204`), and
//! records every call for assertions. Mutations never change the
//! listings; use [`ScriptedApi::with_following_snapshots`] to model a
//! listing that catches up over time.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::{Entity, Handle, MutationKind, RelationKind};
use crate::error::ApiError;
use crate::port::{ApiResponse, GraphApi, RateSnapshot};

/// One scripted reply to a mutation call.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Status(u16),
    StatusWithRate(u16, RateSnapshot),
    /// The request never reached the server.
    Transport(String),
}

#[derive(Default)]
struct Calls {
    list: Vec<(RelationKind, u32)>,
    mutations: Vec<(MutationKind, Handle)>,
    users: Vec<Handle>,
    viewer: usize,
}

pub struct ScriptedApi {
    following: Vec<Vec<Entity>>,
    followers: Vec<Entity>,
    list_statuses: HashMap<(RelationKind, u32), u16>,
    mutation_scripts: Mutex<HashMap<String, VecDeque<ScriptedReply>>>,
    users: Vec<Entity>,
    viewer: Option<Entity>,
    rate: RateSnapshot,
    snapshot: Mutex<usize>,
    calls: Mutex<Calls>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self {
            following: vec![Vec::new()],
            followers: Vec::new(),
            list_statuses: HashMap::new(),
            mutation_scripts: Mutex::new(HashMap::new()),
            users: Vec::new(),
            viewer: None,
            rate: RateSnapshot::default(),
            snapshot: Mutex::new(0),
            calls: Mutex::new(Calls::default()),
        }
    }

    /// Rate headers attached to every response.
    pub fn with_rate(mut self, rate: RateSnapshot) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_following(mut self, entities: Vec<Entity>) -> Self {
        self.following = vec![entities];
        self
    }

    /// Successive views of the following listing. Each fetch of page 1
    /// after the first advances to the next view; the last one sticks.
    pub fn with_following_snapshots(mut self, snapshots: Vec<Vec<Entity>>) -> Self {
        if !snapshots.is_empty() {
            self.following = snapshots;
        }
        self
    }

    pub fn with_followers(mut self, entities: Vec<Entity>) -> Self {
        self.followers = entities;
        self
    }

    /// Answer one listing page with a bare status and no entities.
    pub fn with_list_status(mut self, kind: RelationKind, page: u32, status: u16) -> Self {
        self.list_statuses.insert((kind, page), status);
        self
    }

    /// Queue mutation statuses for a handle, consumed one per call.
    pub fn with_mutation_statuses(self, handle: &str, statuses: &[u16]) -> Self {
        self.with_mutation_replies(
            handle,
            statuses.iter().map(|s| ScriptedReply::Status(*s)).collect(),
        )
    }

    pub fn with_mutation_replies(self, handle: &str, replies: Vec<ScriptedReply>) -> Self {
        self.mutation_scripts
            .lock()
            .unwrap()
            .insert(handle.to_string(), replies.into());
        self
    }

    /// Accounts resolvable through [`GraphApi::user`], in addition to
    /// everything in the listings.
    pub fn with_users(mut self, users: Vec<Entity>) -> Self {
        self.users = users;
        self
    }

    pub fn with_viewer(mut self, viewer: Entity) -> Self {
        self.viewer = Some(viewer);
        self
    }

    pub fn list_calls(&self) -> Vec<(RelationKind, u32)> {
        self.calls.lock().unwrap().list.clone()
    }

    pub fn mutation_calls(&self) -> Vec<(MutationKind, Handle)> {
        self.calls.lock().unwrap().mutations.clone()
    }

    pub fn user_calls(&self) -> Vec<Handle> {
        self.calls.lock().unwrap().users.clone()
    }

    pub fn viewer_calls(&self) -> usize {
        self.calls.lock().unwrap().viewer
    }

    fn following_view(&self, page: u32) -> Vec<Entity> {
        let mut cursor = self.snapshot.lock().unwrap();
        let seen_first_page = self
            .calls
            .lock()
            .unwrap()
            .list
            .iter()
            .filter(|(kind, p)| *kind == RelationKind::Following && *p == 1)
            .count();
        if page == 1 && seen_first_page > 1 {
            *cursor = (*cursor + 1).min(self.following.len() - 1);
        }
        self.following[*cursor].clone()
    }

    fn find_user(&self, handle: &Handle) -> Option<Entity> {
        self.users
            .iter()
            .chain(self.following.iter().flatten())
            .chain(self.followers.iter())
            .find(|e| e.handle() == handle)
            .cloned()
    }
}

impl Default for ScriptedApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphApi for ScriptedApi {
    async fn list_page(
        &self,
        kind: RelationKind,
        page: u32,
        per_page: u32,
    ) -> Result<ApiResponse<Vec<Entity>>, ApiError> {
        self.calls.lock().unwrap().list.push((kind, page));

        if let Some(status) = self.list_statuses.get(&(kind, page)) {
            return Ok(ApiResponse::new(*status, Vec::new())
                .with_rate(self.rate)
                .with_message("scripted failure"));
        }

        let all = match kind {
            RelationKind::Following => self.following_view(page),
            RelationKind::Followers => self.followers.clone(),
        };
        let start = ((page.saturating_sub(1)) * per_page) as usize;
        let body = all
            .into_iter()
            .skip(start)
            .take(per_page as usize)
            .collect();
        Ok(ApiResponse::new(200, body).with_rate(self.rate))
    }

    async fn mutate(
        &self,
        kind: MutationKind,
        handle: &Handle,
    ) -> Result<ApiResponse<()>, ApiError> {
        self.calls
            .lock()
            .unwrap()
            .mutations
            .push((kind, handle.clone()));

        let reply = self
            .mutation_scripts
            .lock()
            .unwrap()
            .get_mut(handle.as_str())
            .and_then(VecDeque::pop_front)
            .unwrap_or(ScriptedReply::Status(204));

        match reply {
            ScriptedReply::Status(status) => Ok(ApiResponse::new(status, ())
                .with_rate(self.rate)
                .with_message("scripted")),
            ScriptedReply::StatusWithRate(status, rate) => {
                Ok(ApiResponse::new(status, ()).with_rate(rate).with_message("scripted"))
            }
            ScriptedReply::Transport(message) => Err(ApiError::Transient(message)),
        }
    }

    async fn user(&self, handle: &Handle) -> Result<ApiResponse<Option<Entity>>, ApiError> {
        self.calls.lock().unwrap().users.push(handle.clone());
        Ok(match self.find_user(handle) {
            Some(entity) => ApiResponse::new(200, Some(entity)).with_rate(self.rate),
            None => ApiResponse::new(404, None)
                .with_rate(self.rate)
                .with_message("Not Found"),
        })
    }

    async fn viewer(&self) -> Result<ApiResponse<Option<Entity>>, ApiError> {
        self.calls.lock().unwrap().viewer += 1;
        Ok(match &self.viewer {
            Some(entity) => ApiResponse::new(200, Some(entity.clone())).with_rate(self.rate),
            None => ApiResponse::new(401, None)
                .with_rate(self.rate)
                .with_message("Requires authentication"),
        })
    }

    fn platform_name(&self) -> &'static str {
        "scripted"
    }
}
