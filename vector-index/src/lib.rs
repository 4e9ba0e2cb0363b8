mod embedded;
mod remote;

use common::error::AppError;
use common::types::{Category, Chunk, RetrievalResult};

pub use embedded::EmbeddedIndex;
pub use remote::RemoteIndex;

/// Aggregate counters returned by a backend after its statistics are queried.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexStats {
    pub chunk_count: u64,
    pub dimension: usize,
}

/// Optional narrowing applied to a similarity search, independent of the
/// ranking itself.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub category: Option<Category>,
    pub min_similarity: Option<f32>,
}

/// Closed, tagged backend selection mirroring the embedding provider: one
/// embedded SurrealDB-backed index, or one remote Pinecone/Chroma-shaped
/// service, chosen once at startup and never re-selected per call.
pub enum VectorIndex {
    Embedded(EmbeddedIndex),
    Remote(RemoteIndex),
}

impl VectorIndex {
    pub async fn initialize(&self) -> Result<(), AppError> {
        match self {
            VectorIndex::Embedded(idx) => idx.initialize().await,
            VectorIndex::Remote(idx) => idx.initialize().await,
        }
    }

    pub async fn upsert(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<usize, AppError> {
        if chunks.len() != embeddings.len() {
            return Err(AppError::Retrieval(format!(
                "chunk count {} does not match embedding count {}",
                chunks.len(),
                embeddings.len()
            )));
        }
        match self {
            VectorIndex::Embedded(idx) => idx.upsert(chunks, embeddings).await,
            VectorIndex::Remote(idx) => idx.upsert(chunks, embeddings).await,
        }
    }

    pub async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<RetrievalResult>, AppError> {
        match self {
            VectorIndex::Embedded(idx) => idx.search(query_vector, top_k, filter).await,
            VectorIndex::Remote(idx) => idx.search(query_vector, top_k, filter).await,
        }
    }

    pub async fn delete(&self, chunk_ids: &[String]) -> Result<usize, AppError> {
        match self {
            VectorIndex::Embedded(idx) => idx.delete(chunk_ids).await,
            VectorIndex::Remote(idx) => idx.delete(chunk_ids).await,
        }
    }

    pub async fn stats(&self) -> Result<IndexStats, AppError> {
        match self {
            VectorIndex::Embedded(idx) => idx.stats().await,
            VectorIndex::Remote(idx) => idx.stats().await,
        }
    }
}
