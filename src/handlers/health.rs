use vidhub_api::HealthResponse;

use crate::response::AppResponse;

/// GET /api/v1/healthcheck
pub async fn health() -> AppResponse<HealthResponse> {
    AppResponse::ok(HealthResponse::ok(), "OK")
}
