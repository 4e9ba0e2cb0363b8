use axum::{
    extract::FromRef,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use api_state::ApiState;

pub mod api_state;
pub mod error;
mod routes;

/// Router for API functionality, version 1. Never imports anything beyond
/// the orchestrator's public entrypoint and its request/response types.
pub fn api_routes_v1<S>(app_state: &ApiState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    Router::new()
        .route("/ask", post(routes::ask::ask))
        .route("/feedback", post(routes::feedback::feedback))
        .route("/health", get(routes::health::health))
        .layer(cors_layer(&app_state.config.cors_origins))
}

/// Empty `cors_origins` means same-origin only is not actually enforceable
/// at this layer, so it defaults to permissive, matching the teacher's
/// posture of CORS as an outer, swappable layer rather than core logic.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    }

    let allowed: Vec<HeaderValue> = origins.iter().filter_map(|origin| origin.parse().ok()).collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}
