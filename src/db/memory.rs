//! In-process store behind the same repository traits as [`PgStore`](super::PgStore).
//!
//! Each collection sits behind its own `RwLock`. Conditional operations do
//! their check and their write under one write guard, which gives them the
//! same atomicity as the single-statement SQL versions.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use super::error::RepositoryError;
use super::models::session::{NewSession, Session};
use super::models::user::{AccountChanges, NewUser, User};
use super::models::video::{CatalogEntry, NewVideo, OwnerProfile, Video, VideoChanges};
use super::repositories::{
    SessionRepository, UserRepository, VideoRepository, WatchHistoryRepository,
};
use crate::catalog::{CatalogPipeline, Filter};

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    sessions: RwLock<HashMap<Uuid, Session>>,
    videos: RwLock<HashMap<Uuid, Video>>,
    // user -> (video -> first watched)
    history: RwLock<HashMap<Uuid, BTreeMap<Uuid, DateTime<Utc>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn owner_profile(&self, owner_id: Uuid) -> Option<OwnerProfile> {
        self.users.read().get(&owner_id).map(OwnerProfile::from)
    }
}

fn unique_violation(column: &str) -> RepositoryError {
    RepositoryError::UniqueViolation(format!("duplicate key value violates unique constraint on {column}"))
}

fn user_not_found(id: Uuid) -> RepositoryError {
    RepositoryError::NotFound(format!("user {id}"))
}

impl UserRepository for MemoryStore {
    fn create_user(&self, new_user: &NewUser) -> Result<User, RepositoryError> {
        let mut users = self.users.write();

        if users.values().any(|user| user.username == new_user.username) {
            return Err(unique_violation("username"));
        }
        if users.values().any(|user| user.email == new_user.email) {
            return Err(unique_violation("email"));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username.clone(),
            email: new_user.email.clone(),
            full_name: new_user.full_name.clone(),
            avatar: None,
            cover_image: None,
            avatar_key: None,
            cover_image_key: None,
            password_hash: new_user.password_hash.clone(),
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    fn find_user(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.read().get(&id).cloned())
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.read().values().find(|user| user.email == email).cloned())
    }

    fn find_user_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .users
            .read()
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    fn update_password(&self, id: Uuid, password_hash: &str) -> Result<User, RepositoryError> {
        let mut users = self.users.write();
        let user = users.get_mut(&id).ok_or_else(|| user_not_found(id))?;

        user.password_hash = password_hash.to_string();
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    fn update_account(&self, id: Uuid, changes: &AccountChanges) -> Result<User, RepositoryError> {
        let mut users = self.users.write();

        let email_taken = changes
            .email
            .as_ref()
            .is_some_and(|email| users.values().any(|user| user.id != id && &user.email == email));
        if email_taken {
            return Err(unique_violation("email"));
        }

        let user = users.get_mut(&id).ok_or_else(|| user_not_found(id))?;
        if changes.is_empty() {
            return Ok(user.clone());
        }
        if let Some(full_name) = &changes.full_name {
            user.full_name = full_name.clone();
        }
        if let Some(email) = &changes.email {
            user.email = email.clone();
        }
        if let Some(avatar) = &changes.avatar {
            user.avatar = Some(avatar.clone());
        }
        if let Some(cover_image) = &changes.cover_image {
            user.cover_image = Some(cover_image.clone());
        }
        if let Some(avatar_key) = &changes.avatar_key {
            user.avatar_key = Some(avatar_key.clone());
        }
        if let Some(cover_image_key) = &changes.cover_image_key {
            user.cover_image_key = Some(cover_image_key.clone());
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }
}

impl SessionRepository for MemoryStore {
    fn create_session(&self, new_session: &NewSession) -> Result<Session, RepositoryError> {
        if !self.users.read().contains_key(&new_session.user_id) {
            return Err(RepositoryError::ForeignKeyViolation(format!(
                "user {} does not exist",
                new_session.user_id
            )));
        }

        let mut sessions = self.sessions.write();
        if sessions.contains_key(&new_session.id) {
            return Err(unique_violation("sessions.id"));
        }

        let now = Utc::now();
        let session = Session {
            id: new_session.id,
            user_id: new_session.user_id,
            token_hash: new_session.token_hash.clone(),
            expires_at: new_session.expires_at,
            created_at: now,
            updated_at: now,
        };
        sessions.insert(session.id, session.clone());
        Ok(session)
    }

    fn find_session(&self, id: Uuid) -> Result<Option<Session>, RepositoryError> {
        Ok(self.sessions.read().get(&id).cloned())
    }

    fn replace_token(
        &self,
        id: Uuid,
        expected_hash: &str,
        new_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut sessions = self.sessions.write();

        match sessions.get_mut(&id) {
            Some(session) if session.token_hash == expected_hash => {
                session.token_hash = new_hash.to_string();
                session.expires_at = expires_at;
                session.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn delete_other_sessions(&self, user_id: Uuid, keep: Uuid) -> Result<usize, RepositoryError> {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|id, session| session.user_id != user_id || *id == keep);
        Ok(before - sessions.len())
    }

    fn delete_user_sessions(&self, user_id: Uuid) -> Result<usize, RepositoryError> {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, session| session.user_id != user_id);
        Ok(before - sessions.len())
    }
}

impl VideoRepository for MemoryStore {
    fn create_video(&self, new_video: &NewVideo) -> Result<Video, RepositoryError> {
        if !self.users.read().contains_key(&new_video.owner_id) {
            return Err(RepositoryError::ForeignKeyViolation(format!(
                "user {} does not exist",
                new_video.owner_id
            )));
        }

        let now = Utc::now();
        let video = Video {
            id: Uuid::new_v4(),
            owner_id: new_video.owner_id,
            video_file: new_video.video_file.clone(),
            video_file_key: new_video.video_file_key.clone(),
            thumbnail: new_video.thumbnail.clone(),
            thumbnail_key: new_video.thumbnail_key.clone(),
            title: new_video.title.clone(),
            description: new_video.description.clone(),
            duration: new_video.duration,
            views: 0,
            is_published: new_video.is_published,
            created_at: now,
            updated_at: now,
        };
        self.videos.write().insert(video.id, video.clone());
        Ok(video)
    }

    fn find_video(&self, id: Uuid) -> Result<Option<Video>, RepositoryError> {
        Ok(self.videos.read().get(&id).cloned())
    }

    fn find_video_with_owner(&self, id: Uuid) -> Result<Option<CatalogEntry>, RepositoryError> {
        let Some(video) = self.find_video(id)? else {
            return Ok(None);
        };
        let owner = self.owner_profile(video.owner_id);
        Ok(Some(CatalogEntry { video, owner }))
    }

    fn aggregate(&self, pipeline: &CatalogPipeline) -> Result<Vec<CatalogEntry>, RepositoryError> {
        let rows: Vec<CatalogEntry> = self
            .videos
            .read()
            .values()
            .cloned()
            .map(CatalogEntry::bare)
            .collect();

        Ok(pipeline.run(rows, &|owner_id| self.owner_profile(owner_id)))
    }

    fn count_matching(&self, filters: &[Filter]) -> Result<u64, RepositoryError> {
        let count = self
            .videos
            .read()
            .values()
            .filter(|video| filters.iter().all(|filter| filter.matches(video)))
            .count();
        Ok(count as u64)
    }

    fn increment_views(&self, id: Uuid) -> Result<Option<i64>, RepositoryError> {
        let mut videos = self.videos.write();
        Ok(videos.get_mut(&id).map(|video| {
            video.views += 1;
            video.views
        }))
    }

    fn update_owned(
        &self,
        id: Uuid,
        owner_id: Uuid,
        changes: &VideoChanges,
    ) -> Result<Option<Video>, RepositoryError> {
        let mut videos = self.videos.write();
        let Some(video) = videos.get_mut(&id).filter(|video| video.owner_id == owner_id) else {
            return Ok(None);
        };

        video.title = changes.title.clone();
        video.description = changes.description.clone();
        if let Some(thumbnail) = &changes.thumbnail {
            video.thumbnail = thumbnail.clone();
        }
        if let Some(thumbnail_key) = &changes.thumbnail_key {
            video.thumbnail_key = thumbnail_key.clone();
        }
        video.updated_at = Utc::now();
        Ok(Some(video.clone()))
    }

    fn toggle_publish_owned(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Video>, RepositoryError> {
        let mut videos = self.videos.write();
        let Some(video) = videos.get_mut(&id).filter(|video| video.owner_id == owner_id) else {
            return Ok(None);
        };

        video.is_published = !video.is_published;
        video.updated_at = Utc::now();
        Ok(Some(video.clone()))
    }

    fn delete_owned(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Video>, RepositoryError> {
        let mut videos = self.videos.write();
        if !videos.get(&id).is_some_and(|video| video.owner_id == owner_id) {
            return Ok(None);
        }

        let removed = videos.remove(&id);
        drop(videos);

        // Mirrors ON DELETE CASCADE.
        for watched in self.history.write().values_mut() {
            watched.remove(&id);
        }
        Ok(removed)
    }
}

impl WatchHistoryRepository for MemoryStore {
    fn record_view(&self, user_id: Uuid, video_id: Uuid) -> Result<(), RepositoryError> {
        self.history
            .write()
            .entry(user_id)
            .or_default()
            .entry(video_id)
            .or_insert_with(Utc::now);
        Ok(())
    }

    fn watched_video_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, RepositoryError> {
        let history = self.history.read();
        let Some(watched) = history.get(&user_id) else {
            return Ok(Vec::new());
        };

        let mut entries: Vec<(DateTime<Utc>, Uuid)> =
            watched.iter().map(|(video_id, at)| (*at, *video_id)).collect();
        entries.sort();
        Ok(entries.into_iter().map(|(_, video_id)| video_id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogRequest, Pagination, SortSpec};
    use std::sync::Arc;
    use std::thread;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            email: format!("{name}@example.com"),
            full_name: name.to_uppercase(),
            password_hash: "hash".to_string(),
        }
    }

    fn new_video(owner_id: Uuid, title: &str, is_published: bool) -> NewVideo {
        NewVideo {
            owner_id,
            video_file: format!("http://cdn/{title}.mp4"),
            video_file_key: format!("{title}.mp4"),
            thumbnail: format!("http://cdn/{title}.png"),
            thumbnail_key: format!("{title}.png"),
            title: title.to_string(),
            description: String::new(),
            duration: 0.0,
            is_published,
        }
    }

    #[test]
    fn duplicate_username_or_email_is_rejected() {
        let store = MemoryStore::new();
        store.create_user(&new_user("alice")).unwrap();

        let same_name = NewUser {
            email: "other@example.com".to_string(),
            ..new_user("alice")
        };
        assert!(matches!(
            store.create_user(&same_name),
            Err(RepositoryError::UniqueViolation(_))
        ));

        let same_email = NewUser {
            username: "alice2".to_string(),
            ..new_user("alice")
        };
        assert!(matches!(
            store.create_user(&same_email),
            Err(RepositoryError::UniqueViolation(_))
        ));
    }

    #[test]
    fn account_email_change_keeps_uniqueness() {
        let store = MemoryStore::new();
        let alice = store.create_user(&new_user("alice")).unwrap();
        store.create_user(&new_user("bob")).unwrap();

        let changes = AccountChanges {
            email: Some("bob@example.com".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            store.update_account(alice.id, &changes),
            Err(RepositoryError::UniqueViolation(_))
        ));

        let own_email = AccountChanges {
            email: Some("alice@example.com".to_string()),
            full_name: Some("Alice A.".to_string()),
            ..Default::default()
        };
        assert_eq!(store.update_account(alice.id, &own_email).unwrap().full_name, "Alice A.");
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let store = Arc::new(MemoryStore::new());
        let owner = store.create_user(&new_user("owner")).unwrap();
        let video = store.create_video(&new_video(owner.id, "hit", true)).unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..25 {
                        store.increment_views(video.id).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.find_video(video.id).unwrap().unwrap().views, 400);
    }

    #[test]
    fn views_do_not_move_updated_at() {
        let store = MemoryStore::new();
        let owner = store.create_user(&new_user("owner")).unwrap();
        let video = store.create_video(&new_video(owner.id, "quiet", true)).unwrap();

        store.increment_views(video.id).unwrap();
        let viewed = store.find_video(video.id).unwrap().unwrap();
        assert_eq!(viewed.views, 1);
        assert_eq!(viewed.updated_at, video.updated_at);

        thread::sleep(std::time::Duration::from_millis(2));
        let toggled = store.toggle_publish_owned(video.id, owner.id).unwrap().unwrap();
        assert!(toggled.updated_at > video.updated_at);
    }

    #[test]
    fn history_suppresses_duplicates() {
        let store = MemoryStore::new();
        let user = store.create_user(&new_user("viewer")).unwrap();
        let video_id = Uuid::new_v4();

        store.record_view(user.id, video_id).unwrap();
        store.record_view(user.id, video_id).unwrap();

        assert_eq!(store.watched_video_ids(user.id).unwrap(), vec![video_id]);
        assert!(store.watched_video_ids(Uuid::new_v4()).unwrap().is_empty());
    }

    #[test]
    fn replace_token_is_compare_and_swap() {
        let store = MemoryStore::new();
        let user = store.create_user(&new_user("rotator")).unwrap();
        let session = store
            .create_session(&NewSession {
                id: Uuid::new_v4(),
                user_id: user.id,
                token_hash: "one".to_string(),
                expires_at: Utc::now(),
            })
            .unwrap();

        assert!(store.replace_token(session.id, "one", "two", Utc::now()).unwrap());
        assert!(!store.replace_token(session.id, "one", "three", Utc::now()).unwrap());
        assert!(!store.replace_token(Uuid::new_v4(), "two", "four", Utc::now()).unwrap());
    }

    #[test]
    fn owned_mutations_ignore_other_users() {
        let store = MemoryStore::new();
        let owner = store.create_user(&new_user("owner")).unwrap();
        let intruder = store.create_user(&new_user("intruder")).unwrap();
        let video = store.create_video(&new_video(owner.id, "mine", false)).unwrap();

        assert!(store.toggle_publish_owned(video.id, intruder.id).unwrap().is_none());
        assert!(store.delete_owned(video.id, intruder.id).unwrap().is_none());
        assert!(!store.find_video(video.id).unwrap().unwrap().is_published);

        let toggled = store.toggle_publish_owned(video.id, owner.id).unwrap().unwrap();
        assert!(toggled.is_published);
        assert!(store.delete_owned(video.id, owner.id).unwrap().is_some());
        assert!(store.find_video(video.id).unwrap().is_none());
    }

    #[test]
    fn aggregate_joins_owner_profile() {
        let store = MemoryStore::new();
        let owner = store.create_user(&new_user("dora")).unwrap();
        store.create_video(&new_video(owner.id, "public", true)).unwrap();
        store.create_video(&new_video(owner.id, "draft", false)).unwrap();

        let request = CatalogRequest {
            text: None,
            owner: None,
            sort: SortSpec::default(),
            pagination: Pagination::default(),
        };
        let pipeline = CatalogPipeline::public(&request);
        let entries = store.aggregate(&pipeline).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].owner.as_ref().unwrap().username, "dora");
        assert_eq!(store.count_matching(&pipeline.match_filters()).unwrap(), 1);

        let own = store
            .aggregate(&CatalogPipeline::owned_by(owner.id, Pagination::default()))
            .unwrap();
        assert_eq!(own.len(), 2);
        assert!(own.iter().all(|entry| entry.owner.is_none()));
    }
}
