use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use vidhub_api::{
    ChangePasswordRequest, CurrentUserResponse, Empty, UpdateAccountRequest, UserResponse,
};

use super::run_blocking;
use crate::auth::Identity;
use crate::error::AppError;
use crate::extract::ApiJson;
use crate::media::UploadForm;
use crate::response::AppResponse;
use crate::services::{AccountService, ProfileImage};

/// POST /api/v1/users/change-password
pub async fn change_password(
    State(accounts): State<Arc<AccountService>>,
    identity: Identity,
    ApiJson(payload): ApiJson<ChangePasswordRequest>,
) -> Result<AppResponse<Empty>, AppError> {
    run_blocking(move || accounts.change_password(identity, &payload)).await?;
    tracing::info!(user_id = %identity.user_id, "Password changed");
    Ok(AppResponse::ok(Empty {}, "Password changed successfully"))
}

/// GET /api/v1/users/current-user
pub async fn current_user(
    State(accounts): State<Arc<AccountService>>,
    identity: Identity,
) -> Result<AppResponse<CurrentUserResponse>, AppError> {
    let (user, watch_history) = run_blocking(move || {
        let user = accounts.current_user(identity)?;
        let watch_history = accounts.watch_history(identity)?;
        Ok((user, watch_history))
    })
    .await?;

    let body = CurrentUserResponse {
        user: user.into(),
        watch_history,
    };
    Ok(AppResponse::ok(body, "Current user fetched successfully"))
}

/// PATCH /api/v1/users/update-account
pub async fn update_account(
    State(accounts): State<Arc<AccountService>>,
    identity: Identity,
    ApiJson(payload): ApiJson<UpdateAccountRequest>,
) -> Result<AppResponse<UserResponse>, AppError> {
    let user = run_blocking(move || accounts.update_account(identity, &payload)).await?;
    Ok(AppResponse::ok(user.into(), "Account details updated successfully"))
}

/// PATCH /api/v1/users/avatar
pub async fn update_avatar(
    State(accounts): State<Arc<AccountService>>,
    State(staging): State<Arc<PathBuf>>,
    identity: Identity,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<AppResponse<UserResponse>, AppError> {
    let user = replace_image(accounts, &staging, identity, ProfileImage::Avatar, multipart).await?;
    Ok(AppResponse::ok(user, "Avatar updated successfully"))
}

/// PATCH /api/v1/users/cover-image
pub async fn update_cover_image(
    State(accounts): State<Arc<AccountService>>,
    State(staging): State<Arc<PathBuf>>,
    identity: Identity,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<AppResponse<UserResponse>, AppError> {
    let user =
        replace_image(accounts, &staging, identity, ProfileImage::CoverImage, multipart).await?;
    Ok(AppResponse::ok(user, "Cover image updated successfully"))
}

async fn replace_image(
    accounts: Arc<AccountService>,
    staging: &Path,
    identity: Identity,
    kind: ProfileImage,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<UserResponse, AppError> {
    let mut form = UploadForm::read(multipart?, staging).await?;
    let file = form.take_file(kind.field_name());
    let user = run_blocking(move || accounts.update_image(identity, kind, file)).await?;
    Ok(user.into())
}
