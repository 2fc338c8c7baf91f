//! Store seam.
//!
//! Services talk to these traits only. [`PgStore`](super::PgStore) and
//! [`MemoryStore`](super::MemoryStore) both implement every one of them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::error::RepositoryError;
use super::models::session::{NewSession, Session};
use super::models::user::{AccountChanges, NewUser, User};
use super::models::video::{CatalogEntry, NewVideo, Video, VideoChanges};
use crate::catalog::{CatalogPipeline, Filter};

pub mod session_repository;
pub mod user_repository;
pub mod video_repository;
pub mod watch_history_repository;

pub trait UserRepository: Send + Sync {
    /// Fails with `UniqueViolation` when the username or email is taken.
    fn create_user(&self, new_user: &NewUser) -> Result<User, RepositoryError>;
    fn find_user(&self, id: Uuid) -> Result<Option<User>, RepositoryError>;
    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    fn find_user_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;
    fn update_password(&self, id: Uuid, password_hash: &str) -> Result<User, RepositoryError>;
    fn update_account(&self, id: Uuid, changes: &AccountChanges) -> Result<User, RepositoryError>;
}

pub trait SessionRepository: Send + Sync {
    fn create_session(&self, new_session: &NewSession) -> Result<Session, RepositoryError>;
    fn find_session(&self, id: Uuid) -> Result<Option<Session>, RepositoryError>;
    /// Swaps the stored hash only if it still equals `expected_hash`.
    /// Returns whether a row was updated.
    fn replace_token(
        &self,
        id: Uuid,
        expected_hash: &str,
        new_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;
    fn delete_other_sessions(&self, user_id: Uuid, keep: Uuid) -> Result<usize, RepositoryError>;
    fn delete_user_sessions(&self, user_id: Uuid) -> Result<usize, RepositoryError>;
}

pub trait VideoRepository: Send + Sync {
    fn create_video(&self, new_video: &NewVideo) -> Result<Video, RepositoryError>;
    fn find_video(&self, id: Uuid) -> Result<Option<Video>, RepositoryError>;
    /// Video plus its owner's profile, if the owner row still exists.
    fn find_video_with_owner(&self, id: Uuid) -> Result<Option<CatalogEntry>, RepositoryError>;
    /// Runs every stage of the pipeline, in order.
    fn aggregate(&self, pipeline: &CatalogPipeline) -> Result<Vec<CatalogEntry>, RepositoryError>;
    fn count_matching(&self, filters: &[Filter]) -> Result<u64, RepositoryError>;
    /// Atomic `views + 1`; `None` when the video does not exist.
    fn increment_views(&self, id: Uuid) -> Result<Option<i64>, RepositoryError>;

    // Ownership-gated mutations: one conditional statement each, `None`
    // when no row has both the id and the owner.
    fn update_owned(
        &self,
        id: Uuid,
        owner_id: Uuid,
        changes: &VideoChanges,
    ) -> Result<Option<Video>, RepositoryError>;
    fn toggle_publish_owned(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Video>, RepositoryError>;
    fn delete_owned(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Video>, RepositoryError>;
}

pub trait WatchHistoryRepository: Send + Sync {
    /// Idempotent: a second view of the same video adds nothing.
    fn record_view(&self, user_id: Uuid, video_id: Uuid) -> Result<(), RepositoryError>;
    fn watched_video_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, RepositoryError>;
}

/// One handle per repository, all backed by the same store.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub videos: Arc<dyn VideoRepository>,
    pub history: Arc<dyn WatchHistoryRepository>,
}

impl Stores {
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: UserRepository + SessionRepository + VideoRepository + WatchHistoryRepository + 'static,
    {
        Self {
            users: store.clone(),
            sessions: store.clone(),
            videos: store.clone(),
            history: store,
        }
    }
}
