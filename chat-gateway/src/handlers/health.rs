use crate::models::HealthStatus;
use crate::services::metrics::get_metrics;
use axum::{http::StatusCode, response::IntoResponse, Json};
use service_core::error::AppError;
use service_core::utils::timestamp;

/// Liveness probe. Independent of the upstream provider.
pub async fn health_check() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        timestamp: timestamp(),
    })
}

pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}

pub async fn not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}
