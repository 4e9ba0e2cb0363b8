use serde::{Deserialize, Serialize};

use common::error::AppError;
use common::storage::db::SurrealDbClient;
use common::types::{Category, Chunk, RetrievalResult};

use crate::{IndexStats, SearchFilter};

const TABLE: &str = "chunk_embedding";
const INDEX_NAME: &str = "idx_embedding_chunk_embedding";

/// SurrealDB-backed vector index, embedding the chunk itself alongside its
/// vector for self-contained retrieval without a join. Mirrors the
/// dimension-coherence policy used for the service's other HNSW indexes:
/// an index whose declared dimension no longer matches the configured
/// embedding dimension is dropped and recreated rather than left stale.
pub struct EmbeddedIndex {
    db: SurrealDbClient,
    dimension: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChunkEmbeddingRecord {
    id: String,
    document_id: String,
    chunk_index: usize,
    content: String,
    tokens: usize,
    category: String,
    source_label: String,
    embedding: Vec<f32>,
}

impl From<(&Chunk, &[f32])> for ChunkEmbeddingRecord {
    fn from((chunk, embedding): (&Chunk, &[f32])) -> Self {
        Self {
            id: chunk.id.clone(),
            document_id: chunk.document_id.clone(),
            chunk_index: chunk.chunk_index,
            content: chunk.content.clone(),
            tokens: chunk.tokens,
            category: chunk.category.as_str().to_string(),
            source_label: chunk.source_label.clone(),
            embedding: embedding.to_vec(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScoredRow {
    id: surrealdb::sql::Thing,
    document_id: String,
    chunk_index: usize,
    content: String,
    tokens: usize,
    category: String,
    source_label: String,
    score: f32,
}

#[derive(Debug, Deserialize)]
struct CountRow {
    count: u64,
}

enum HnswIndexState {
    Missing,
    Matches,
    Different(usize),
}

impl EmbeddedIndex {
    pub fn new(db: SurrealDbClient, dimension: usize) -> Self {
        Self { db, dimension }
    }

    pub async fn initialize(&self) -> Result<(), AppError> {
        match self.hnsw_state().await? {
            HnswIndexState::Matches => Ok(()),
            HnswIndexState::Missing => self.define_index(self.dimension).await,
            HnswIndexState::Different(existing) => {
                tracing::info!(
                    existing_dimension = existing,
                    target_dimension = self.dimension,
                    "recreating vector index for new embedding dimension"
                );
                self.define_index(self.dimension).await
            }
        }
    }

    async fn hnsw_state(&self) -> Result<HnswIndexState, AppError> {
        let query = format!("INFO FOR TABLE {TABLE};");
        let mut response = self.db.query(query).await?;
        let info: Option<serde_json::Value> = response.take(0)?;
        let Some(info) = info else {
            return Ok(HnswIndexState::Missing);
        };

        let definition = info
            .get("indexes")
            .and_then(|i| i.get(INDEX_NAME))
            .and_then(|v| v.as_str());

        let Some(definition) = definition else {
            return Ok(HnswIndexState::Missing);
        };

        let current = definition
            .split("DIMENSION")
            .nth(1)
            .and_then(|rest| rest.split_whitespace().next())
            .and_then(|token| token.parse::<usize>().ok());

        match current {
            Some(dim) if dim == self.dimension => Ok(HnswIndexState::Matches),
            Some(dim) => Ok(HnswIndexState::Different(dim)),
            None => Ok(HnswIndexState::Missing),
        }
    }

    async fn define_index(&self, dimension: usize) -> Result<(), AppError> {
        let query = format!(
            "BEGIN TRANSACTION;
             REMOVE INDEX IF EXISTS {INDEX_NAME} ON TABLE {TABLE};
             DEFINE INDEX {INDEX_NAME} ON TABLE {TABLE} \
                FIELDS embedding HNSW DIMENSION {dimension} DIST COSINE TYPE F32 EFC 100 M 8;
             COMMIT TRANSACTION;"
        );
        self.db.query(query).await?.check()?;
        Ok(())
    }

    pub async fn upsert(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<usize, AppError> {
        let mut count = 0usize;
        for (chunk, embedding) in chunks.iter().zip(embeddings.iter()) {
            let record = ChunkEmbeddingRecord::from((chunk, embedding.as_slice()));
            // `UPDATE` on a missing record id creates it, so this doubles as an upsert.
            let _: Option<serde_json::Value> = self
                .db
                .client
                .update((TABLE, record.id.clone()))
                .content(record)
                .await?;
            count += 1;
        }
        Ok(count)
    }

    pub async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<RetrievalResult>, AppError> {
        let mut category_clause = String::new();
        if let Some(category) = filter.category {
            category_clause = format!(" AND category = '{}'", category.as_str());
        }

        let query = format!(
            "SELECT id, document_id, chunk_index, content, tokens, category, source_label, \
                vector::similarity::cosine(embedding, $query) AS score \
             FROM {TABLE} WHERE embedding <|{top_k},100|> $query{category_clause} \
             ORDER BY score DESC LIMIT {top_k};"
        );

        let mut response = self
            .db
            .query(&query)
            .await
            .map_err(AppError::from)?;
        let rows: Vec<ScoredRow> = response
            .take(0)
            .unwrap_or_default();

        let min_similarity = filter.min_similarity.unwrap_or(0.0);

        Ok(rows
            .into_iter()
            .filter(|row| row.score >= min_similarity)
            .enumerate()
            .map(|(rank, row)| RetrievalResult {
                chunk: Chunk {
                    id: row.id.id.to_raw(),
                    document_id: row.document_id,
                    chunk_index: row.chunk_index,
                    content: row.content,
                    tokens: row.tokens,
                    category: Category::from_str_defaulted(&row.category),
                    source_label: row.source_label,
                    created_at: chrono::Utc::now(),
                },
                similarity_score: row.score,
                relevance_rank: rank + 1,
            })
            .collect())
    }

    pub async fn delete(&self, chunk_ids: &[String]) -> Result<usize, AppError> {
        let mut deleted = 0usize;
        for id in chunk_ids {
            let result: Option<serde_json::Value> =
                self.db.client.delete((TABLE, id.as_str())).await?;
            if result.is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    pub async fn stats(&self) -> Result<IndexStats, AppError> {
        let mut response = self
            .db
            .query(format!("SELECT count() AS count FROM {TABLE} GROUP ALL;"))
            .await?;
        let rows: Vec<CountRow> = response.take(0).unwrap_or_default();
        Ok(IndexStats {
            chunk_count: rows.first().map_or(0, |r| r.count),
            dimension: self.dimension,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::types::Document;
    use uuid::Uuid;

    async fn memory_index(dimension: usize) -> EmbeddedIndex {
        let database = Uuid::new_v4().to_string();
        let db = SurrealDbClient::memory("vector_index_tests", &database)
            .await
            .expect("in-memory db");
        EmbeddedIndex::new(db, dimension)
    }

    fn sample_chunk(id_suffix: &str) -> Chunk {
        let document = Document::new("doc1", "content", Category::Yoga, "source");
        Chunk::new(
            document.id,
            0,
            format!("chunk body {id_suffix}"),
            10,
            document.category,
            document.source_label,
        )
    }

    #[tokio::test]
    async fn initialize_creates_index_when_missing() {
        let index = memory_index(4).await;
        index.initialize().await.expect("initialize should succeed");
        let stats = index.stats().await.expect("stats should succeed");
        assert_eq!(stats.dimension, 4);
    }

    #[tokio::test]
    async fn upsert_then_search_finds_the_chunk() {
        let index = memory_index(3).await;
        index.initialize().await.expect("initialize");

        let chunk = sample_chunk("a");
        index
            .upsert(&[chunk.clone()], &[vec![1.0, 0.0, 0.0]])
            .await
            .expect("upsert");

        let results = index
            .search(&[1.0, 0.0, 0.0], 5, &SearchFilter::default())
            .await
            .expect("search");

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.id, chunk.id);
    }

    #[tokio::test]
    async fn delete_removes_the_chunk() {
        let index = memory_index(3).await;
        index.initialize().await.expect("initialize");

        let chunk = sample_chunk("b");
        index
            .upsert(&[chunk.clone()], &[vec![0.0, 1.0, 0.0]])
            .await
            .expect("upsert");

        let deleted = index.delete(&[chunk.id.clone()]).await.expect("delete");
        assert_eq!(deleted, 1);

        let stats = index.stats().await.expect("stats");
        assert_eq!(stats.chunk_count, 0);
    }
}
