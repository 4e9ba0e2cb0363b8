use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceCitation {
    pub source: String,
    pub chunk_id: String,
    pub relevance_score: f32,
}

/// The orchestrator's GENERATE output: grounded content, its citations, a
/// derived confidence, and any safety notices carried over from C5.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedResponse {
    pub content: String,
    pub sources: Vec<SourceCitation>,
    pub confidence: f32,
    pub safety_notices: Vec<String>,
}
