use serde::{Deserialize, Serialize};

/// HTTP status codes used by the envelope.
///
/// Serialized as the bare number so the wire shape stays `"statusCode": 200`.
/// This is WASM-compatible and doesn't depend on `axum::http::StatusCode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum StatusCode {
    Ok = 200,
    Created = 201,
    BadRequest = 400,
    Unauthorized = 401,
    Forbidden = 403,
    NotFound = 404,
    Conflict = 409,
    InternalServerError = 500,
    BadGateway = 502,
}

impl StatusCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn is_success(self) -> bool {
        self.as_u16() < 400
    }
}

impl From<StatusCode> for u16 {
    fn from(code: StatusCode) -> Self {
        code.as_u16()
    }
}

impl TryFrom<u16> for StatusCode {
    type Error = String;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        match code {
            200 => Ok(Self::Ok),
            201 => Ok(Self::Created),
            400 => Ok(Self::BadRequest),
            401 => Ok(Self::Unauthorized),
            403 => Ok(Self::Forbidden),
            404 => Ok(Self::NotFound),
            409 => Ok(Self::Conflict),
            500 => Ok(Self::InternalServerError),
            502 => Ok(Self::BadGateway),
            other => Err(format!("unsupported status code {other}")),
        }
    }
}

/// Success envelope: `{ statusCode, data, message }`.
///
/// Every successful route answers with exactly one of these. The backend
/// wraps it in a type that implements Axum's `IntoResponse`.
///
/// # Examples
///
/// ```rust
/// use vidhub_api::{ApiResponse, Empty, StatusCode};
///
/// let response = ApiResponse::ok("data", "Fetched");
/// assert_eq!(response.status_code, StatusCode::Ok);
///
/// let response = ApiResponse::created(Empty {}, "Created");
/// assert_eq!(response.status_code, StatusCode::Created);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: StatusCode,
    pub data: T,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn new(status_code: StatusCode, data: T, message: impl Into<String>) -> Self {
        Self {
            status_code,
            data,
            message: message.into(),
        }
    }

    /// 200 OK with data
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self::new(StatusCode::Ok, data, message)
    }

    /// 201 Created with data
    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self::new(StatusCode::Created, data, message)
    }
}

/// Empty payload, serialized as `{}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}
