use chrono::{DateTime, Utc};
use uuid::Uuid;

use common::error::AppError;
use common::types::{RetrievalResult, SafetyAssessment};

/// Per-query working state threaded through the orchestrator's drive
/// function. Built at ADMIT, mutated in place by each stage, consumed at
/// RESPOND.
pub struct QueryContext {
    pub query_id: Uuid,
    pub session_id: String,
    pub query: String,
    pub max_results: usize,
    pub min_similarity: f32,
    pub admitted_at: DateTime<Utc>,
    pub safety_assessment: Option<SafetyAssessment>,
    pub retrieval_results: Vec<RetrievalResult>,
}

impl QueryContext {
    pub fn new(query: String, session_id: Option<String>, max_results: usize, min_similarity: f32) -> Self {
        Self {
            query_id: Uuid::new_v4(),
            session_id: session_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            query,
            max_results,
            min_similarity,
            admitted_at: Utc::now(),
            safety_assessment: None,
            retrieval_results: Vec::new(),
        }
    }

    pub fn abort(&self, err: AppError) -> AppError {
        tracing::error!(
            query_id = %self.query_id,
            session_id = %self.session_id,
            error = %err,
            "orchestrator aborted on an internal invariant violation"
        );
        err
    }

    pub fn elapsed_ms(&self) -> u64 {
        let millis = (Utc::now() - self.admitted_at).num_milliseconds().max(0);
        u64::try_from(millis).unwrap_or(u64::MAX)
    }
}
