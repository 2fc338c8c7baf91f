//! # vidhub-api
//!
//! Shared API types for the vidhub service.
//! This crate is WASM-compatible and can be used by the backend as well as by
//! frontend clients that want to speak the same envelope.
//!
//! ## Features
//!
//! - Request DTOs (RegisterRequest, LoginRequest, VideoListQuery, ...)
//! - Response DTOs (UserResponse, VideoResponse, VideoListResponse, ...)
//! - Success envelope (`ApiResponse`) and error envelope (`ApiError`)
//! - The error-kind taxonomy shared by every route (`ErrorKind`)
//!
//! ## Example
//!
//! ```rust
//! use vidhub_api::{ApiResponse, HealthResponse};
//!
//! let body = ApiResponse::ok(HealthResponse::ok(), "OK");
//! let json = serde_json::to_value(&body).unwrap();
//! assert_eq!(json["statusCode"], 200);
//! ```

pub mod error;
pub mod requests;
pub mod responses;
pub mod result;

// Re-exports for convenient access
pub use error::{ApiError, ErrorKind};
pub use requests::*;
pub use responses::*;
pub use result::{ApiResponse, Empty, StatusCode};
