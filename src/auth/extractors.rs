use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::{header, request::Parts};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use super::cookies::ACCESS_COOKIE;
use super::tokens::TokenService;
use crate::error::AppError;

/// Authenticated caller of a protected route.
///
/// Resolved from `Authorization: Bearer <JWT>` or, failing that, the
/// `accessToken` cookie. Any failure rejects the request with
/// `Unauthorized` before the handler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
}

/// Caller of a route that also serves anonymous visitors. Never rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaybeIdentity(pub Option<Identity>);

const BEARER: &str = "Bearer ";

fn bearer_token(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(value) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|_| AppError::unauthorized("Malformed Authorization header"))?;

    value
        .strip_prefix(BEARER)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(Some)
        .ok_or_else(|| AppError::unauthorized("Malformed Authorization header"))
}

fn cookie_token(parts: &Parts) -> Option<String> {
    CookieJar::from_headers(&parts.headers)
        .get(ACCESS_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

pub fn resolve_identity(parts: &Parts, tokens: &TokenService) -> Result<Identity, AppError> {
    let token = match bearer_token(parts)? {
        Some(token) => token.to_string(),
        None => cookie_token(parts).ok_or_else(|| AppError::unauthorized("Authentication required"))?,
    };

    let user_id = tokens.verify_access_token(&token)?;
    Ok(Identity { user_id })
}

impl<S> FromRequestParts<S> for Identity
where
    Arc<TokenService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let tokens = Arc::<TokenService>::from_ref(state);
        resolve_identity(parts, &tokens)
    }
}

impl<S> FromRequestParts<S> for MaybeIdentity
where
    Arc<TokenService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let tokens = Arc::<TokenService>::from_ref(state);
        match resolve_identity(parts, &tokens) {
            Ok(identity) => Ok(MaybeIdentity(Some(identity))),
            Err(err) => {
                tracing::debug!(reason = %err, "Continuing as anonymous viewer");
                Ok(MaybeIdentity(None))
            }
        }
    }
}
