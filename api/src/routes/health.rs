use axum::{response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: DateTime<Utc>,
}

/// `GET /health`: always 200 while the process is serving requests.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
    })
}
