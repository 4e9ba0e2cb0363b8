use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::safety::SafetyAssessment;

/// Append-only record of one completed query. Created post-response on the
/// dispatching path; never mutated after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionLogRecord {
    pub id: String,
    pub query_id: Uuid,
    pub session_id: String,
    pub query: String,
    pub response_content: String,
    pub confidence: f32,
    pub retrieval_count: usize,
    pub processing_time_ms: u64,
    pub created_at: DateTime<Utc>,
}

/// Append-only record of a blocked query, dispatched on the BLOCKED path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyIncidentRecord {
    pub id: String,
    pub query_id: Uuid,
    pub session_id: String,
    pub query: String,
    pub assessment: SafetyAssessment,
    pub created_at: DateTime<Utc>,
}
