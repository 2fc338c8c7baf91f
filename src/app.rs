use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef},
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, patch, post},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::auth::cookies::CookieSettings;
use crate::auth::jwt::JwtManager;
use crate::auth::password::PasswordManager;
use crate::auth::TokenService;
use crate::config::Config;
use crate::db::Stores;
use crate::error::AppError;
use crate::handlers::auth::{login, logout, refresh_token, register};
use crate::handlers::health::health;
use crate::handlers::user::{
    change_password, current_user, update_account, update_avatar, update_cover_image,
};
use crate::handlers::video::{
    delete_video, get_video, list_own_videos, list_videos, toggle_publish, update_video,
    upload_video,
};
use crate::media::LocalMediaStorage;
use crate::services::{AccountService, VideoService};

/// Shared state; handlers pull the piece they need through `FromRef`.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub videos: Arc<VideoService>,
    pub tokens: Arc<TokenService>,
    pub cookies: CookieSettings,
    /// Directory multipart files are staged in.
    pub staging: Arc<PathBuf>,
}

pub fn build_state(config: &Config, stores: Stores) -> anyhow::Result<AppState> {
    let media = LocalMediaStorage::new(&config.media_root, &config.public_base_url)
        .with_context(|| format!("Failed to prepare media root {}", config.media_root.display()))?;
    let media = Arc::new(media);

    std::fs::create_dir_all(&config.upload_tmp_dir).with_context(|| {
        format!("Failed to prepare upload dir {}", config.upload_tmp_dir.display())
    })?;

    let access_ttl = chrono::Duration::minutes(config.access_token_ttl_minutes);
    let refresh_ttl = chrono::Duration::days(config.refresh_token_ttl_days);
    let tokens = Arc::new(TokenService::new(
        JwtManager::new(&config.access_token_secret, access_ttl),
        JwtManager::new(&config.refresh_token_secret, refresh_ttl),
        config.session_policy,
        stores.sessions.clone(),
    ));

    let accounts = AccountService::new(
        stores.users.clone(),
        stores.history.clone(),
        tokens.clone(),
        PasswordManager::new(config.bcrypt_cost),
        media.clone(),
    );
    let videos = VideoService::new(stores.videos.clone(), stores.history.clone(), media);

    Ok(AppState {
        accounts: Arc::new(accounts),
        videos: Arc::new(videos),
        tokens,
        cookies: CookieSettings {
            secure: config.is_production(),
            access_max_age: time::Duration::minutes(config.access_token_ttl_minutes),
            refresh_max_age: time::Duration::days(config.refresh_token_ttl_days),
        },
        staging: Arc::new(config.upload_tmp_dir.clone()),
    })
}

/// Account routes, mounted at `/api/v1/users`.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh-token", post(refresh_token))
        .route("/logout", post(logout))
        .route("/change-password", post(change_password))
        .route("/current-user", get(current_user))
        .route("/update-account", patch(update_account))
        .route("/avatar", patch(update_avatar))
        .route("/cover-image", patch(update_cover_image))
}

/// Catalog routes, mounted at `/api/v1/videos`.
pub fn video_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_videos))
        .route("/upload", post(upload_video))
        .route("/user/videos", get(list_own_videos))
        .route("/{videoId}", get(get_video))
        .route("/u/{videoId}", patch(update_video).delete(delete_video))
        .route("/toggle/publish/{videoId}", patch(toggle_publish))
}

fn cors_layer(origin: &str) -> anyhow::Result<CorsLayer> {
    let origin = HeaderValue::from_str(origin)
        .with_context(|| format!("CORS_ORIGIN `{origin}` is not a valid header value"))?;

    // Cookies need credentials, which rules out a wildcard origin.
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::exact(origin))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true))
}

async fn route_not_found() -> AppError {
    AppError::not_found("Route not found")
}

/// Builds the complete application.
pub fn build_router(state: AppState, config: &Config) -> anyhow::Result<Router> {
    let api = Router::new()
        .route("/healthcheck", get(health))
        .nest("/users", user_routes())
        .nest("/videos", video_routes());

    let router = Router::new()
        .nest("/api/v1", api)
        .nest_service("/media", ServeDir::new(&config.media_root))
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(config.max_upload_mb * 1024 * 1024))
        .layer(cors_layer(&config.cors_origin)?)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(router)
}
