use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, State};
use vidhub_api::{
    CatalogVideoResponse, Empty, PageQuery, PublishStateResponse, VideoDetailResponse,
    VideoListQuery, VideoListResponse, VideoResponse,
};

use super::run_blocking;
use crate::auth::{Identity, MaybeIdentity};
use crate::catalog::{CatalogRequest, Pagination};
use crate::error::AppError;
use crate::extract::ApiQuery;
use crate::media::UploadForm;
use crate::response::AppResponse;
use crate::services::videos::parse_video_id;
use crate::services::{PublishDraft, UpdateDraft, VideoService};

/// GET /api/v1/videos
pub async fn list_videos(
    State(videos): State<Arc<VideoService>>,
    MaybeIdentity(viewer): MaybeIdentity,
    ApiQuery(query): ApiQuery<VideoListQuery>,
) -> Result<AppResponse<VideoListResponse<CatalogVideoResponse>>, AppError> {
    let request = CatalogRequest::try_from(query)?;
    tracing::debug!(
        viewer = ?viewer.map(|identity| identity.user_id),
        page = request.pagination.page(),
        "Listing public videos"
    );

    let page = run_blocking(move || videos.list(&request)).await?;
    Ok(AppResponse::ok(page.into_response(), "Videos fetched successfully"))
}

/// GET /api/v1/videos/{videoId}
pub async fn get_video(
    State(videos): State<Arc<VideoService>>,
    MaybeIdentity(viewer): MaybeIdentity,
    Path(video_id): Path<String>,
) -> Result<AppResponse<VideoDetailResponse>, AppError> {
    let video_id = parse_video_id(&video_id)?;
    let entry = run_blocking(move || videos.get(video_id, viewer)).await?;
    Ok(AppResponse::ok(entry.into(), "Video fetched successfully"))
}

/// POST /api/v1/videos/upload
pub async fn upload_video(
    State(videos): State<Arc<VideoService>>,
    State(staging): State<Arc<PathBuf>>,
    identity: Identity,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<AppResponse<VideoResponse>, AppError> {
    let mut form = UploadForm::read(multipart?, &staging).await?;
    let draft = PublishDraft {
        title: form.text("title"),
        description: form.text("description"),
        video_file: form.take_file("videoFile"),
        thumbnail: form.take_file("thumbnail"),
    };

    let video = run_blocking(move || videos.publish(identity, draft)).await?;
    Ok(AppResponse::created(video.into(), "Video uploaded successfully"))
}

/// PATCH /api/v1/videos/u/{videoId}
pub async fn update_video(
    State(videos): State<Arc<VideoService>>,
    State(staging): State<Arc<PathBuf>>,
    identity: Identity,
    Path(video_id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<AppResponse<VideoResponse>, AppError> {
    let video_id = parse_video_id(&video_id)?;
    let mut form = UploadForm::read(multipart?, &staging).await?;
    let draft = UpdateDraft {
        title: form.text("title"),
        description: form.text("description"),
        thumbnail: form.take_file("thumbnail"),
    };

    let video = run_blocking(move || videos.update(identity, video_id, draft)).await?;
    Ok(AppResponse::ok(video.into(), "Video updated successfully"))
}

/// DELETE /api/v1/videos/u/{videoId}
pub async fn delete_video(
    State(videos): State<Arc<VideoService>>,
    identity: Identity,
    Path(video_id): Path<String>,
) -> Result<AppResponse<Empty>, AppError> {
    let video_id = parse_video_id(&video_id)?;
    run_blocking(move || videos.delete(identity, video_id)).await?;
    Ok(AppResponse::ok(Empty {}, "Video deleted successfully"))
}

/// PATCH /api/v1/videos/toggle/publish/{videoId}
pub async fn toggle_publish(
    State(videos): State<Arc<VideoService>>,
    identity: Identity,
    Path(video_id): Path<String>,
) -> Result<AppResponse<PublishStateResponse>, AppError> {
    let video_id = parse_video_id(&video_id)?;
    let video = run_blocking(move || videos.toggle_publish(identity, video_id)).await?;
    Ok(AppResponse::ok(
        PublishStateResponse {
            is_published: video.is_published,
        },
        "Publish status toggled successfully",
    ))
}

/// GET /api/v1/videos/user/videos
pub async fn list_own_videos(
    State(videos): State<Arc<VideoService>>,
    identity: Identity,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<AppResponse<VideoListResponse<VideoResponse>>, AppError> {
    let pagination = Pagination::try_from(query)?;
    let page = run_blocking(move || videos.list_own(identity, pagination)).await?;
    Ok(AppResponse::ok(page.into_response(), "User videos fetched successfully"))
}
