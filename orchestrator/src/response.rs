use serde::{Deserialize, Serialize};

use common::types::{GeneratedResponse, RetrievalResult, SafetyAssessment};

/// The orchestrator's complete output for one query, serialized verbatim by
/// the HTTP binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub query: String,
    pub response: GeneratedResponse,
    pub retrieval_results: Vec<RetrievalResult>,
    pub safety_assessment: SafetyAssessment,
    pub processing_time_ms: u64,
    pub session_id: String,
}
