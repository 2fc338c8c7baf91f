//! Fixtures shared by unit tests.

use chrono::{Duration, TimeZone, Utc};
use uuid::Uuid;

use crate::db::models::video::Video;

/// Deterministic user id for readable assertions.
pub fn user_id(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

pub struct VideoFixture {
    video: Video,
}

impl VideoFixture {
    pub fn new(title: &str) -> Self {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        Self {
            video: Video {
                id: Uuid::new_v4(),
                owner_id: user_id(1000),
                video_file: format!("http://cdn/{title}.mp4"),
                video_file_key: format!("videos/{title}.mp4"),
                thumbnail: format!("http://cdn/{title}.png"),
                thumbnail_key: format!("thumbnails/{title}.png"),
                title: title.to_string(),
                description: String::new(),
                duration: 60.0,
                views: 0,
                is_published: true,
                created_at: now,
                updated_at: now,
            },
        }
    }

    pub fn owner(mut self, owner_id: Uuid) -> Self {
        self.video.owner_id = owner_id;
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.video.description = description.to_string();
        self
    }

    pub fn views(mut self, views: i64) -> Self {
        self.video.views = views;
        self
    }

    pub fn published(mut self, is_published: bool) -> Self {
        self.video.is_published = is_published;
        self
    }

    /// Moves both timestamps back by `minutes`.
    pub fn age_minutes(mut self, minutes: i64) -> Self {
        self.video.created_at -= Duration::minutes(minutes);
        self.video.updated_at = self.video.created_at;
        self
    }

    pub fn build(self) -> Video {
        self.video
    }
}
