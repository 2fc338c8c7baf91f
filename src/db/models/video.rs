use crate::db::schema::videos;
use chrono::{DateTime, Utc};
use diesel::{AsChangeset, Insertable, Queryable, Selectable};
use uuid::Uuid;
use vidhub_api::{CatalogVideoResponse, OwnerSummary, VideoDetailResponse, VideoResponse};

use super::user::User;

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = videos)]
pub struct NewVideo {
    pub owner_id: Uuid,
    pub video_file: String,
    pub video_file_key: String,
    pub thumbnail: String,
    pub thumbnail_key: String,
    pub title: String,
    pub description: String,
    pub duration: f64,
    pub is_published: bool,
}

// Field order follows the table: `get_result::<Video>` relies on it.
#[derive(Queryable, Selectable, Debug, Clone, PartialEq)]
#[diesel(table_name = videos)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Video {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub video_file: String,
    pub video_file_key: String,
    pub thumbnail: String,
    pub thumbnail_key: String,
    pub title: String,
    pub description: String,
    pub duration: f64,
    pub views: i64,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Metadata update applied by the owner; a `None` thumbnail keeps the current one.
#[derive(AsChangeset, Debug, Clone)]
#[diesel(table_name = videos)]
pub struct VideoChanges {
    pub title: String,
    pub description: String,
    pub thumbnail: Option<String>,
    pub thumbnail_key: Option<String>,
}

/// Owner projection attached by the catalog join.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnerProfile {
    pub username: String,
    pub avatar: Option<String>,
    pub full_name: String,
}

impl From<&User> for OwnerProfile {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            avatar: user.avatar.clone(),
            full_name: user.full_name.clone(),
        }
    }
}

impl From<(String, Option<String>, String)> for OwnerProfile {
    fn from((username, avatar, full_name): (String, Option<String>, String)) -> Self {
        Self {
            username,
            avatar,
            full_name,
        }
    }
}

/// One row flowing through the catalog pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub video: Video,
    pub owner: Option<OwnerProfile>,
}

impl CatalogEntry {
    pub fn bare(video: Video) -> Self {
        Self { video, owner: None }
    }
}

impl From<Video> for VideoResponse {
    fn from(video: Video) -> Self {
        VideoResponse {
            id: video.id,
            video_file: video.video_file,
            thumbnail: video.thumbnail,
            title: video.title,
            description: video.description,
            duration: video.duration,
            views: video.views,
            is_published: video.is_published,
            owner: video.owner_id,
            created_at: video.created_at,
            updated_at: video.updated_at,
        }
    }
}

impl From<CatalogEntry> for VideoResponse {
    fn from(entry: CatalogEntry) -> Self {
        entry.video.into()
    }
}

impl From<CatalogEntry> for CatalogVideoResponse {
    fn from(entry: CatalogEntry) -> Self {
        CatalogVideoResponse {
            video: entry.video.into(),
            owner_details: entry.owner.map(|owner| OwnerSummary {
                username: owner.username,
                avatar: owner.avatar,
                full_name: None,
            }),
        }
    }
}

impl From<CatalogEntry> for VideoDetailResponse {
    fn from(entry: CatalogEntry) -> Self {
        let video = entry.video;
        VideoDetailResponse {
            id: video.id,
            video_file: video.video_file,
            thumbnail: video.thumbnail,
            title: video.title,
            description: video.description,
            duration: video.duration,
            views: video.views,
            is_published: video.is_published,
            created_at: video.created_at,
            owner: entry.owner.map(|owner| OwnerSummary {
                username: owner.username,
                avatar: owner.avatar,
                full_name: Some(owner.full_name),
            }),
        }
    }
}
