//! Video catalog operations.
//!
//! Reads honor visibility: an unpublished video exists only for its owner.
//! Mutations are ownership-gated through one conditional store call each;
//! when that call matches nothing, the video is re-read and the failure is
//! classified by [`assert_owner`].

use std::sync::Arc;

use uuid::Uuid;

use crate::auth::Identity;
use crate::auth::ownership::assert_owner;
use crate::catalog::{CatalogPage, CatalogPipeline, CatalogRequest, PageInfo, Pagination};
use crate::db::models::video::{CatalogEntry, NewVideo, Video, VideoChanges};
use crate::db::repositories::{VideoRepository, WatchHistoryRepository};
use crate::error::AppError;
use crate::media::{MediaStorage, StagedFile, StoredMedia, remove_best_effort};

/// Multipart input of an upload; every part is required.
#[derive(Debug, Default)]
pub struct PublishDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub video_file: Option<StagedFile>,
    pub thumbnail: Option<StagedFile>,
}

/// Metadata update; the thumbnail is optional.
#[derive(Debug, Default)]
pub struct UpdateDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<StagedFile>,
}

pub fn parse_video_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::invalid_argument("Invalid videoId"))
}

fn video_not_found() -> AppError {
    AppError::not_found("Video not found")
}

fn required_text(
    title: Option<String>,
    description: Option<String>,
) -> Result<(String, String), AppError> {
    let present = |value: Option<String>| {
        value
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };
    match (present(title), present(description)) {
        (Some(title), Some(description)) => Ok((title, description)),
        _ => Err(AppError::invalid_argument("Title and description are required")),
    }
}

pub struct VideoService {
    videos: Arc<dyn VideoRepository>,
    history: Arc<dyn WatchHistoryRepository>,
    media: Arc<dyn MediaStorage>,
}

impl VideoService {
    pub fn new(
        videos: Arc<dyn VideoRepository>,
        history: Arc<dyn WatchHistoryRepository>,
        media: Arc<dyn MediaStorage>,
    ) -> Self {
        Self {
            videos,
            history,
            media,
        }
    }

    pub fn list(&self, request: &CatalogRequest) -> Result<CatalogPage, AppError> {
        let pipeline = CatalogPipeline::public(request);
        self.run_page(&pipeline, request.pagination)
    }

    pub fn list_own(&self, identity: Identity, pagination: Pagination) -> Result<CatalogPage, AppError> {
        let pipeline = CatalogPipeline::owned_by(identity.user_id, pagination);
        self.run_page(&pipeline, pagination)
    }

    fn run_page(&self, pipeline: &CatalogPipeline, pagination: Pagination) -> Result<CatalogPage, AppError> {
        let entries = self.videos.aggregate(pipeline)?;
        let total = self.videos.count_matching(&pipeline.match_filters())?;

        Ok(CatalogPage {
            entries,
            info: PageInfo::new(total, pagination),
        })
    }

    /// Counts a view for every caller; only identified viewers get a
    /// watch-history entry.
    pub fn get(&self, video_id: Uuid, viewer: Option<Identity>) -> Result<CatalogEntry, AppError> {
        let visible_to_viewer = |entry: &CatalogEntry| {
            entry.video.is_published
                || viewer.is_some_and(|viewer| viewer.user_id == entry.video.owner_id)
        };

        let mut entry = self
            .videos
            .find_video_with_owner(video_id)?
            .filter(visible_to_viewer)
            .ok_or_else(video_not_found)?;

        // Deleted between the read and the increment.
        entry.video.views = self
            .videos
            .increment_views(video_id)?
            .ok_or_else(video_not_found)?;

        if let Some(viewer) = viewer {
            self.history.record_view(viewer.user_id, video_id)?;
        }

        Ok(entry)
    }

    pub fn publish(&self, owner: Identity, draft: PublishDraft) -> Result<Video, AppError> {
        let (title, description) = required_text(draft.title, draft.description)?;
        let video_file = draft
            .video_file
            .ok_or_else(|| AppError::invalid_argument("Video file is required"))?;
        let thumbnail = draft
            .thumbnail
            .ok_or_else(|| AppError::invalid_argument("Thumbnail is required"))?;

        let stored_video = self.store(&video_file)?;
        let stored_thumbnail = match self.store(&thumbnail) {
            Ok(stored) => stored,
            Err(err) => {
                remove_best_effort(self.media.as_ref(), &stored_video.key);
                return Err(err);
            }
        };

        let new_video = NewVideo {
            owner_id: owner.user_id,
            video_file: stored_video.url.clone(),
            video_file_key: stored_video.key.clone(),
            thumbnail: stored_thumbnail.url.clone(),
            thumbnail_key: stored_thumbnail.key.clone(),
            title,
            description,
            duration: stored_video.duration.unwrap_or(0.0),
            is_published: false,
        };

        match self.videos.create_video(&new_video) {
            Ok(video) => {
                tracing::info!(video_id = %video.id, user_id = %owner.user_id, "Video uploaded");
                Ok(video)
            }
            Err(err) => {
                remove_best_effort(self.media.as_ref(), &stored_video.key);
                remove_best_effort(self.media.as_ref(), &stored_thumbnail.key);
                Err(err.into())
            }
        }
    }

    pub fn update(&self, identity: Identity, video_id: Uuid, draft: UpdateDraft) -> Result<Video, AppError> {
        let (title, description) = required_text(draft.title, draft.description)?;

        // Checked before storing anything so strangers cannot fill the media store.
        let current = self.videos.find_video(video_id)?;
        let previous_thumbnail = assert_owner(current.as_ref(), Some(&identity))?
            .thumbnail_key
            .clone();

        let new_thumbnail = draft.thumbnail.as_ref().map(|file| self.store(file)).transpose()?;
        let changes = VideoChanges {
            title,
            description,
            thumbnail: new_thumbnail.as_ref().map(|stored| stored.url.clone()),
            thumbnail_key: new_thumbnail.as_ref().map(|stored| stored.key.clone()),
        };

        let outcome = self.videos.update_owned(video_id, identity.user_id, &changes);
        match (outcome, new_thumbnail) {
            (Ok(Some(video)), new_thumbnail) => {
                if new_thumbnail.is_some() {
                    remove_best_effort(self.media.as_ref(), &previous_thumbnail);
                }
                Ok(video)
            }
            (failed, new_thumbnail) => {
                if let Some(stored) = new_thumbnail {
                    remove_best_effort(self.media.as_ref(), &stored.key);
                }
                match failed {
                    Err(err) => Err(err.into()),
                    Ok(_) => Err(self.classify_rejection(video_id, identity)),
                }
            }
        }
    }

    pub fn delete(&self, identity: Identity, video_id: Uuid) -> Result<Video, AppError> {
        let Some(video) = self.videos.delete_owned(video_id, identity.user_id)? else {
            return Err(self.classify_rejection(video_id, identity));
        };

        remove_best_effort(self.media.as_ref(), &video.video_file_key);
        remove_best_effort(self.media.as_ref(), &video.thumbnail_key);
        tracing::info!(%video_id, user_id = %identity.user_id, "Video deleted");

        Ok(video)
    }

    pub fn toggle_publish(&self, identity: Identity, video_id: Uuid) -> Result<Video, AppError> {
        self.videos
            .toggle_publish_owned(video_id, identity.user_id)?
            .ok_or_else(|| self.classify_rejection(video_id, identity))
    }

    /// Explains why a conditional mutation matched no row.
    fn classify_rejection(&self, video_id: Uuid, identity: Identity) -> AppError {
        let current = match self.videos.find_video(video_id) {
            Ok(current) => current,
            Err(err) => return err.into(),
        };

        match assert_owner(current.as_ref(), Some(&identity)) {
            Err(err) => err,
            // Owner matches now: the row changed hands or vanished and came
            // back between the two statements.
            Ok(_) => AppError::conflict("Video was modified concurrently, please retry"),
        }
    }

    fn store(&self, file: &StagedFile) -> Result<StoredMedia, AppError> {
        self.media
            .store(file.path(), file.extension())
            .map_err(AppError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SortSpec;
    use crate::db::MemoryStore;
    use crate::db::models::user::NewUser;
    use crate::db::repositories::UserRepository;
    use crate::media::upload::test_support::staged;
    use crate::media::{LocalMediaStorage, MediaError};
    use std::path::Path;
    use tempfile::TempDir;
    use vidhub_api::ErrorKind;

    struct Harness {
        store: Arc<MemoryStore>,
        service: VideoService,
        media_dir: TempDir,
        staging: TempDir,
    }

    impl Harness {
        fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            let media_dir = TempDir::new().unwrap();
            let media = Arc::new(LocalMediaStorage::new(media_dir.path(), "http://cdn").unwrap());
            Self::with_media(store, media, media_dir)
        }

        fn with_media(store: Arc<MemoryStore>, media: Arc<dyn MediaStorage>, media_dir: TempDir) -> Self {
            let service = VideoService::new(store.clone(), store.clone(), media);
            Self {
                store,
                service,
                media_dir,
                staging: TempDir::new().unwrap(),
            }
        }

        fn user(&self, name: &str) -> Identity {
            let user = self
                .store
                .create_user(&NewUser {
                    username: name.to_string(),
                    email: format!("{name}@example.com"),
                    full_name: name.to_uppercase(),
                    password_hash: "hash".to_string(),
                })
                .unwrap();
            Identity { user_id: user.id }
        }

        fn draft(&self, title: &str) -> PublishDraft {
            PublishDraft {
                title: Some(title.to_string()),
                description: Some(format!("{title} description")),
                video_file: Some(staged(self.staging.path(), "clip.mp4", b"video-bytes")),
                thumbnail: Some(staged(self.staging.path(), "thumb.png", b"png-bytes")),
            }
        }

        fn published(&self, owner: Identity, title: &str) -> Video {
            let video = self.service.publish(owner, self.draft(title)).unwrap();
            self.service.toggle_publish(owner, video.id).unwrap()
        }

        fn stored_objects(&self) -> usize {
            std::fs::read_dir(self.media_dir.path()).unwrap().count()
        }

        fn request(&self) -> CatalogRequest {
            CatalogRequest {
                text: None,
                owner: None,
                sort: SortSpec::default(),
                pagination: Pagination::default(),
            }
        }
    }

    /// Accepts video files, fails every thumbnail.
    struct FailingThumbnails(LocalMediaStorage);

    impl MediaStorage for FailingThumbnails {
        fn store(&self, source: &Path, extension: Option<&str>) -> Result<StoredMedia, MediaError> {
            if extension == Some("png") {
                return Err(MediaError::Io(std::io::Error::other("bucket unavailable")));
            }
            self.0.store(source, extension)
        }

        fn remove(&self, key: &str) -> Result<(), MediaError> {
            self.0.remove(key)
        }
    }

    #[test]
    fn upload_is_unpublished_and_stored() {
        let h = Harness::new();
        let owner = h.user("ana");

        let video = h.service.publish(owner, h.draft("Sunset")).unwrap();

        assert!(!video.is_published);
        assert_eq!(video.owner_id, owner.user_id);
        assert_eq!(video.views, 0);
        assert_eq!(video.duration, 0.0);
        assert!(video.video_file.starts_with("http://cdn/media/"));
        assert_eq!(h.stored_objects(), 2);
    }

    #[test]
    fn upload_requires_every_part() {
        let h = Harness::new();
        let owner = h.user("ana");

        let mut missing_title = h.draft("x");
        missing_title.title = Some("   ".to_string());
        let mut missing_file = h.draft("x");
        missing_file.video_file = None;
        let mut missing_thumbnail = h.draft("x");
        missing_thumbnail.thumbnail = None;

        for draft in [missing_title, missing_file, missing_thumbnail] {
            let err = h.service.publish(owner, draft).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        }
        assert_eq!(h.stored_objects(), 0);
    }

    #[test]
    fn failed_thumbnail_upload_removes_stored_video_file() {
        let store = Arc::new(MemoryStore::new());
        let media_dir = TempDir::new().unwrap();
        let local = LocalMediaStorage::new(media_dir.path(), "http://cdn").unwrap();
        let h = Harness::with_media(store, Arc::new(FailingThumbnails(local)), media_dir);
        let owner = h.user("ana");

        let err = h.service.publish(owner, h.draft("Sunset")).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UpstreamFailure);
        assert_eq!(h.stored_objects(), 0);
    }

    #[test]
    fn public_listing_hides_drafts_and_counts_matches() {
        let h = Harness::new();
        let owner = h.user("ana");
        for i in 0..25 {
            h.published(owner, &format!("clip {i}"));
        }
        h.service.publish(owner, h.draft("draft")).unwrap();

        let mut request = h.request();
        request.pagination = Pagination::new(Some(3), Some(10)).unwrap();
        let page = h.service.list(&request).unwrap();

        assert_eq!(page.entries.len(), 5);
        assert_eq!(page.info.total_count, 25);
        assert_eq!(page.info.total_pages, 3);
        assert_eq!(page.info.current_page, 3);
        assert!(page.entries.iter().all(|entry| entry.video.is_published));
        assert!(page.entries.iter().all(|entry| entry.owner.is_some()));
    }

    #[test]
    fn total_count_ignores_the_requested_window() {
        let h = Harness::new();
        let owner = h.user("ana");
        for i in 0..23 {
            h.published(owner, &format!("clip {i}"));
        }
        h.published(h.user("bob"), "trailer");
        h.service.publish(owner, h.draft("clip draft")).unwrap();

        let mut request = h.request();
        request.text = Some("clip".to_string());

        for (page, limit) in [(1, 10), (3, 10), (1, 7), (2, 100)] {
            request.pagination = Pagination::new(Some(page), Some(limit)).unwrap();
            let listed = h.service.list(&request).unwrap();
            assert_eq!(listed.info.total_count, 23, "page {page} limit {limit}");
        }
    }

    #[test]
    fn owner_listing_includes_drafts() {
        let h = Harness::new();
        let owner = h.user("ana");
        h.published(owner, "live");
        h.service.publish(owner, h.draft("draft")).unwrap();
        h.published(h.user("bob"), "not mine");

        let page = h.service.list_own(owner, Pagination::default()).unwrap();

        assert_eq!(page.info.total_count, 2);
        assert!(page.entries.iter().any(|entry| !entry.video.is_published));
    }

    #[test]
    fn get_counts_views_and_records_history_for_identified_viewers() {
        let h = Harness::new();
        let owner = h.user("ana");
        let viewer = h.user("bob");
        let video = h.published(owner, "clip");

        let anonymous = h.service.get(video.id, None).unwrap();
        assert_eq!(anonymous.video.views, 1);
        assert_eq!(anonymous.owner.unwrap().full_name, "ANA");
        assert!(h.store.watched_video_ids(owner.user_id).unwrap().is_empty());

        let seen = h.service.get(video.id, Some(viewer)).unwrap();
        assert_eq!(seen.video.views, 2);
        h.service.get(video.id, Some(viewer)).unwrap();
        assert_eq!(h.store.watched_video_ids(viewer.user_id).unwrap(), vec![video.id]);
    }

    #[test]
    fn drafts_are_not_found_for_everyone_but_the_owner() {
        let h = Harness::new();
        let owner = h.user("ana");
        let draft = h.service.publish(owner, h.draft("draft")).unwrap();

        assert_eq!(h.service.get(draft.id, None).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(
            h.service.get(draft.id, Some(h.user("bob"))).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert!(h.service.get(draft.id, Some(owner)).is_ok());
        assert_eq!(
            h.service.get(Uuid::new_v4(), None).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn mutations_distinguish_missing_from_foreign() {
        let h = Harness::new();
        let owner = h.user("ana");
        let stranger = h.user("eve");
        let video = h.published(owner, "clip");
        let missing = Uuid::new_v4();

        assert_eq!(
            h.service.toggle_publish(stranger, video.id).unwrap_err().kind(),
            ErrorKind::Forbidden
        );
        assert_eq!(
            h.service.toggle_publish(stranger, missing).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            h.service.delete(stranger, video.id).unwrap_err().kind(),
            ErrorKind::Forbidden
        );
        assert_eq!(h.service.delete(owner, missing).unwrap_err().kind(), ErrorKind::NotFound);

        let update = UpdateDraft {
            title: Some("mine now".to_string()),
            description: Some("hijacked".to_string()),
            thumbnail: Some(staged(h.staging.path(), "evil.png", b"x")),
        };
        assert_eq!(
            h.service.update(stranger, video.id, update).unwrap_err().kind(),
            ErrorKind::Forbidden
        );
        // Nothing was stored for the rejected update.
        assert_eq!(h.stored_objects(), 2);
        assert_eq!(h.store.find_video(video.id).unwrap().unwrap().title, "clip");
    }

    #[test]
    fn toggle_flips_each_time() {
        let h = Harness::new();
        let owner = h.user("ana");
        let video = h.service.publish(owner, h.draft("clip")).unwrap();

        assert!(h.service.toggle_publish(owner, video.id).unwrap().is_published);
        assert!(!h.service.toggle_publish(owner, video.id).unwrap().is_published);
    }

    #[test]
    fn update_replaces_thumbnail_and_drops_the_old_object() {
        let h = Harness::new();
        let owner = h.user("ana");
        let video = h.service.publish(owner, h.draft("clip")).unwrap();

        let updated = h
            .service
            .update(
                owner,
                video.id,
                UpdateDraft {
                    title: Some("Better title".to_string()),
                    description: Some("Better description".to_string()),
                    thumbnail: Some(staged(h.staging.path(), "new.jpg", b"jpg")),
                },
            )
            .unwrap();

        assert_eq!(updated.title, "Better title");
        assert_ne!(updated.thumbnail_key, video.thumbnail_key);
        assert!(updated.thumbnail_key.ends_with(".jpg"));
        assert!(!h.media_dir.path().join(&video.thumbnail_key).exists());
        assert_eq!(h.stored_objects(), 2);
    }

    #[test]
    fn update_without_thumbnail_keeps_it() {
        let h = Harness::new();
        let owner = h.user("ana");
        let video = h.service.publish(owner, h.draft("clip")).unwrap();

        let updated = h
            .service
            .update(
                owner,
                video.id,
                UpdateDraft {
                    title: Some("t".to_string()),
                    description: Some("d".to_string()),
                    thumbnail: None,
                },
            )
            .unwrap();

        assert_eq!(updated.thumbnail_key, video.thumbnail_key);
    }

    #[test]
    fn delete_removes_row_and_media() {
        let h = Harness::new();
        let owner = h.user("ana");
        let video = h.service.publish(owner, h.draft("clip")).unwrap();

        h.service.delete(owner, video.id).unwrap();

        assert!(h.store.find_video(video.id).unwrap().is_none());
        assert_eq!(h.stored_objects(), 0);
    }

    #[test]
    fn video_ids_must_be_uuids() {
        assert_eq!(
            parse_video_id("42").unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert!(parse_video_id(&Uuid::new_v4().to_string()).is_ok());
    }
}
