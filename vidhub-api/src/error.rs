use serde::{Deserialize, Serialize};

use crate::result::StatusCode;

/// Failure taxonomy shared by every route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidArgument,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    UpstreamFailure,
    Internal,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            Self::InvalidArgument => StatusCode::BadRequest,
            Self::Unauthorized => StatusCode::Unauthorized,
            Self::Forbidden => StatusCode::Forbidden,
            Self::NotFound => StatusCode::NotFound,
            Self::Conflict => StatusCode::Conflict,
            Self::UpstreamFailure => StatusCode::BadGateway,
            Self::Internal => StatusCode::InternalServerError,
        }
    }
}

/// Error envelope: `{ statusCode, message, errorKind }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub status_code: StatusCode,
    pub message: String,
    pub error_kind: ErrorKind,
}

impl ApiError {
    pub fn new(error_kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status_code: error_kind.status(),
            message: message.into(),
            error_kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_their_status_codes() {
        assert_eq!(ErrorKind::InvalidArgument.status().as_u16(), 400);
        assert_eq!(ErrorKind::Unauthorized.status().as_u16(), 401);
        assert_eq!(ErrorKind::Forbidden.status().as_u16(), 403);
        assert_eq!(ErrorKind::NotFound.status().as_u16(), 404);
        assert_eq!(ErrorKind::Conflict.status().as_u16(), 409);
        assert_eq!(ErrorKind::UpstreamFailure.status().as_u16(), 502);
        assert_eq!(ErrorKind::Internal.status().as_u16(), 500);
    }

    #[test]
    fn error_envelope_shape() {
        let body = ApiError::new(ErrorKind::Forbidden, "Not the owner");
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(
            json,
            r#"{"statusCode":403,"message":"Not the owner","errorKind":"Forbidden"}"#
        );
    }
}
