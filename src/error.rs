use axum::{
    Json,
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use vidhub_api::{ApiError, ErrorKind};

use crate::auth::password::PasswordError;
use crate::auth::tokens::TokenError;
use crate::db::error::RepositoryError;
use crate::media::MediaError;
use crate::response::convert_status;

const UPSTREAM_MESSAGE: &str = "A backing service failed to complete the request";
const INTERNAL_MESSAGE: &str = "An internal server error occurred";
const NOT_FOUND_MESSAGE: &str = "Resource not found";
const CONFLICT_MESSAGE: &str = "Resource already exists";

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),

    // Detail is logged, never sent.
    #[error("Upstream failure: {0}")]
    UpstreamFailure(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (kind, message, internal_detail) = self.get_error_info();

        if let Some(ref detail) = internal_detail {
            tracing::error!(error_kind = ?kind, %status, detail, "Request failed");
        }

        (status, Json(ApiError::new(kind, message))).into_response()
    }
}

impl AppError {
    /// Kind, client-facing message, and the detail that stays in the logs.
    fn get_error_info(&self) -> (ErrorKind, String, Option<String>) {
        match self {
            AppError::InvalidArgument(msg) => (ErrorKind::InvalidArgument, msg.clone(), None),
            AppError::Unauthorized(msg) => (ErrorKind::Unauthorized, msg.clone(), None),
            AppError::Forbidden(msg) => (ErrorKind::Forbidden, msg.clone(), None),
            AppError::NotFound(msg) => (ErrorKind::NotFound, msg.clone(), None),
            AppError::Conflict(msg) => (ErrorKind::Conflict, msg.clone(), None),
            AppError::UpstreamFailure(detail) => (
                ErrorKind::UpstreamFailure,
                UPSTREAM_MESSAGE.to_string(),
                Some(detail.clone()),
            ),
            AppError::Internal(detail) => (
                ErrorKind::Internal,
                INTERNAL_MESSAGE.to_string(),
                Some(detail.clone()),
            ),
        }
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        AppError::InvalidArgument(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        AppError::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        AppError::UpstreamFailure(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        self.get_error_info().0
    }

    pub fn status_code(&self) -> StatusCode {
        convert_status(self.kind().status())
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(detail) => {
                tracing::debug!(%detail, "Store reported a missing record");
                AppError::not_found(NOT_FOUND_MESSAGE)
            }
            RepositoryError::UniqueViolation(detail) => {
                tracing::debug!(%detail, "Store rejected a duplicate");
                AppError::conflict(CONFLICT_MESSAGE)
            }
            other => AppError::upstream(other.to_string()),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid => AppError::unauthorized("Invalid token"),
            TokenError::Expired => AppError::unauthorized("Token expired"),
            TokenError::Revoked => {
                AppError::conflict("Refresh token has been revoked or already used")
            }
            TokenError::Signing(detail) => AppError::internal(detail),
            TokenError::Store(err) => err.into(),
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::internal(err.to_string())
    }
}

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        AppError::upstream(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(err: JsonRejection) -> Self {
        AppError::invalid_argument(format!("Invalid JSON body: {}", err.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(err: QueryRejection) -> Self {
        AppError::invalid_argument(format!("Invalid query string: {}", err.body_text()))
    }
}

impl From<MultipartRejection> for AppError {
    fn from(err: MultipartRejection) -> Self {
        AppError::invalid_argument(format!("Invalid multipart body: {}", err.body_text()))
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::invalid_argument(format!("Invalid multipart body: {}", err.body_text()))
    }
}
