use serde::{Deserialize, Serialize};

use super::chunk::Chunk;

/// A chunk paired with a similarity score and its 1-based rank within one
/// query's result list. Invariants across a list are enforced by the
/// retrieval engine that constructs it, not by this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub chunk: Chunk,
    pub similarity_score: f32,
    pub relevance_rank: usize,
}
