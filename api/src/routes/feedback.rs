use axum::{extract::Query, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct FeedbackParams {
    query_id: String,
    feedback: String,
}

#[derive(Debug, Serialize)]
struct FeedbackResponse {
    status: &'static str,
    query_id: String,
}

/// `POST /feedback`: records the rating and acknowledges it. There is
/// nowhere for this to fail beyond query-string parsing, which axum's
/// extractor rejects before the handler body runs.
pub async fn feedback(Query(params): Query<FeedbackParams>) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(query_id = %params.query_id, feedback = %params.feedback, "feedback received");

    Ok(Json(FeedbackResponse {
        status: "feedback_received",
        query_id: params.query_id,
    }))
}
