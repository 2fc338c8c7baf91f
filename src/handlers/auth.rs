use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum_extra::extract::cookie::CookieJar;
use vidhub_api::{
    Empty, LoginRequest, LoginResponse, RefreshTokenRequest, RegisterRequest, TokenPairResponse,
    UserResponse,
};

use super::run_blocking;
use crate::auth::Identity;
use crate::auth::cookies::{CookieSettings, REFRESH_COOKIE};
use crate::error::AppError;
use crate::extract::ApiJson;
use crate::response::AppResponse;
use crate::services::AccountService;

/// POST /api/v1/users/register
pub async fn register(
    State(accounts): State<Arc<AccountService>>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<AppResponse<UserResponse>, AppError> {
    let user = run_blocking(move || accounts.register(payload)).await?;
    Ok(AppResponse::created(user.into(), "User registered successfully"))
}

/// POST /api/v1/users/login
///
/// The token pair goes out twice: as httpOnly cookies for browsers and in the
/// body for clients that send `Authorization: Bearer`.
pub async fn login(
    State(accounts): State<Arc<AccountService>>,
    State(cookies): State<CookieSettings>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<(CookieJar, AppResponse<LoginResponse>), AppError> {
    let (user, pair) = run_blocking(move || accounts.login(&payload)).await?;

    let jar = cookies.set_tokens(jar, &pair);
    let body = LoginResponse {
        user: user.into(),
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    };
    Ok((jar, AppResponse::ok(body, "User logged in successfully")))
}

/// POST /api/v1/users/refresh-token
///
/// The cookie wins over the body; an absent or unreadable body is fine as
/// long as the cookie is there.
pub async fn refresh_token(
    State(accounts): State<Arc<AccountService>>,
    State(cookies): State<CookieSettings>,
    jar: CookieJar,
    payload: Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> Result<(CookieJar, AppResponse<TokenPairResponse>), AppError> {
    let from_cookie = jar
        .get(REFRESH_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty());
    let token = match from_cookie {
        Some(token) => Some(token),
        None => payload.ok().and_then(|Json(body)| body.refresh_token),
    };

    let pair = run_blocking(move || accounts.refresh(token.as_deref())).await?;
    let jar = cookies.set_tokens(jar, &pair);
    let body = TokenPairResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    };
    Ok((jar, AppResponse::ok(body, "Access token refreshed")))
}

/// POST /api/v1/users/logout
pub async fn logout(
    State(accounts): State<Arc<AccountService>>,
    State(cookies): State<CookieSettings>,
    identity: Identity,
    jar: CookieJar,
) -> Result<(CookieJar, AppResponse<Empty>), AppError> {
    run_blocking(move || accounts.logout(identity)).await?;
    Ok((
        cookies.clear_tokens(jar),
        AppResponse::ok(Empty {}, "User logged out successfully"),
    ))
}
