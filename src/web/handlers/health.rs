//! Health check.

use axum::Json;

use crate::web::dto::HealthResponse;

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "authority".to_string(),
    })
}
