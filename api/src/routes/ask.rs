use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;

use orchestrator::AskRequest;

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct AskPayload {
    query: String,
    #[serde(default = "default_max_chunks")]
    max_chunks: usize,
    #[serde(default = "default_min_similarity")]
    min_similarity: f32,
    #[serde(default = "default_user_id")]
    user_id: String,
    session_id: Option<String>,
}

fn default_max_chunks() -> usize {
    5
}

fn default_min_similarity() -> f32 {
    0.7
}

fn default_user_id() -> String {
    "anonymous".to_string()
}

/// `POST /ask`: admits against the rate limiter keyed by `user_id`, then
/// drives the full ADMIT → … → RESPOND flow. Only input validation and
/// admission can fail this request; everything past that degrades inside
/// the orchestrator instead of surfacing here.
pub async fn ask(State(state): State<ApiState>, Json(payload): Json<AskPayload>) -> Result<impl IntoResponse, ApiError> {
    validate(&payload)?;

    if !state.orchestrator.admit(Some(&payload.user_id)).await {
        return Err(ApiError::RateLimited);
    }

    let response = state
        .orchestrator
        .handle_query(AskRequest {
            query: payload.query,
            max_chunks: payload.max_chunks,
            min_similarity: payload.min_similarity,
            session_id: payload.session_id,
        })
        .await;

    Ok(Json(response))
}

fn validate(payload: &AskPayload) -> Result<(), ApiError> {
    let query_len = payload.query.chars().count();
    if query_len < 1 || query_len > 1000 {
        return Err(ApiError::ValidationError(
            "query must be between 1 and 1000 characters".to_string(),
        ));
    }
    if payload.max_chunks < 1 || payload.max_chunks > 20 {
        return Err(ApiError::ValidationError("max_chunks must be between 1 and 20".to_string()));
    }
    if !(0.0..=1.0).contains(&payload.min_similarity) {
        return Err(ApiError::ValidationError(
            "min_similarity must be between 0 and 1".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(query: &str) -> AskPayload {
        AskPayload {
            query: query.to_string(),
            max_chunks: 5,
            min_similarity: 0.7,
            user_id: default_user_id(),
            session_id: None,
        }
    }

    #[test]
    fn empty_query_is_rejected() {
        assert!(validate(&payload("")).is_err());
    }

    #[test]
    fn query_over_the_length_limit_is_rejected() {
        let long_query = "a".repeat(1001);
        assert!(validate(&payload(&long_query)).is_err());
    }

    #[test]
    fn max_chunks_out_of_range_is_rejected() {
        let mut request = payload("what is yoga?");
        request.max_chunks = 0;
        assert!(validate(&request).is_err());
        request.max_chunks = 21;
        assert!(validate(&request).is_err());
    }

    #[test]
    fn min_similarity_out_of_range_is_rejected() {
        let mut request = payload("what is yoga?");
        request.min_similarity = -0.1;
        assert!(validate(&request).is_err());
        request.min_similarity = 1.1;
        assert!(validate(&request).is_err());
    }

    #[test]
    fn well_formed_payload_passes_validation() {
        assert!(validate(&payload("what is mountain pose?")).is_ok());
    }
}
