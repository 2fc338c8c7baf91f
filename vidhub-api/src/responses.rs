use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Profile of the caller plus the ids of the videos they watched.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUserResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub watch_history: Vec<Uuid>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
}

/// Minimal projection of a video's owner.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    pub username: String,
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoResponse {
    pub id: Uuid,
    pub video_file: String,
    pub thumbnail: String,
    pub title: String,
    pub description: String,
    pub duration: f64,
    pub views: i64,
    pub is_published: bool,
    pub owner: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A catalog row: the video plus its owner projection.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CatalogVideoResponse {
    #[serde(flatten)]
    pub video: VideoResponse,
    pub owner_details: Option<OwnerSummary>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetailResponse {
    pub id: Uuid,
    pub video_file: String,
    pub thumbnail: String,
    pub title: String,
    pub description: String,
    pub duration: f64,
    pub views: i64,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub owner: Option<OwnerSummary>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VideoListResponse<T> {
    pub videos: Vec<T>,
    pub total_videos: u64,
    pub total_pages: u64,
    pub current_page: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub struct PublishStateResponse {
    pub is_published: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_payload_uses_camel_case_totals() {
        let payload: VideoListResponse<CatalogVideoResponse> = VideoListResponse {
            videos: Vec::new(),
            total_videos: 25,
            total_pages: 3,
            current_page: 1,
        };
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["totalVideos"], 25);
        assert_eq!(json["totalPages"], 3);
        assert_eq!(json["currentPage"], 1);
    }

    #[test]
    fn owner_summary_omits_absent_full_name() {
        let owner = OwnerSummary {
            username: "alice".to_string(),
            avatar: None,
            full_name: None,
        };
        let json = serde_json::to_string(&owner).unwrap();
        assert_eq!(json, r#"{"username":"alice","avatar":null}"#);
    }
}
