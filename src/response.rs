use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use vidhub_api::{ApiResponse, StatusCode as ApiStatusCode};

/// Axum side of `vidhub_api::ApiResponse`: the HTTP status always matches
/// the `statusCode` field of the envelope.
///
/// ```rust,ignore
/// AppResponse::ok(video, "Video fetched successfully")
/// AppResponse::created(user, "User registered successfully")
/// ```
pub struct AppResponse<T> {
    inner: ApiResponse<T>,
}

impl<T> AppResponse<T>
where
    T: Serialize,
{
    pub fn new(inner: ApiResponse<T>) -> Self {
        Self { inner }
    }

    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self::new(ApiResponse::ok(data, message))
    }

    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self::new(ApiResponse::created(data, message))
    }
}

pub(crate) fn convert_status(api_status: ApiStatusCode) -> StatusCode {
    match api_status {
        ApiStatusCode::Ok => StatusCode::OK,
        ApiStatusCode::Created => StatusCode::CREATED,
        ApiStatusCode::BadRequest => StatusCode::BAD_REQUEST,
        ApiStatusCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ApiStatusCode::Forbidden => StatusCode::FORBIDDEN,
        ApiStatusCode::NotFound => StatusCode::NOT_FOUND,
        ApiStatusCode::Conflict => StatusCode::CONFLICT,
        ApiStatusCode::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        ApiStatusCode::BadGateway => StatusCode::BAD_GATEWAY,
    }
}

impl<T> IntoResponse for AppResponse<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        let status = convert_status(self.inner.status_code);
        (status, Json(self.inner)).into_response()
    }
}
