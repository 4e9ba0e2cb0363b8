use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use common::config::AppConfig;
use common::error::AppError;
use common::types::{Category, Chunk, RetrievalResult};

use crate::{IndexStats, SearchFilter};

/// HTTP client for a Pinecone-shaped vector index REST API. Chunk content and
/// the denormalized fields needed to reconstruct a `Chunk` are carried as
/// vector metadata, since Pinecone has no separate document store.
pub struct RemoteIndex {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    dimension: usize,
}

impl RemoteIndex {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        let host = config
            .pinecone_environment
            .clone()
            .ok_or_else(|| AppError::Configuration("pinecone_environment is not set".into()))?;
        let api_key = config
            .pinecone_api_key
            .clone()
            .ok_or_else(|| AppError::Configuration("pinecone_api_key is not set".into()))?;

        Ok(Self {
            client: reqwest::Client::new(),
            base_url: host,
            api_key,
            dimension: config.embedding_dimension,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{path}", self.base_url.trim_end_matches('/'));
        self.client
            .request(method, url)
            .header("Api-Key", &self.api_key)
            .header("Content-Type", "application/json")
    }

    pub async fn initialize(&self) -> Result<(), AppError> {
        let response = self.request(reqwest::Method::GET, "/describe_index_stats").send().await?;
        response.error_for_status().map_err(AppError::from)?;
        Ok(())
    }

    pub async fn upsert(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<usize, AppError> {
        const BATCH_SIZE: usize = 100;
        let mut count = 0usize;

        for batch in chunks.chunks(BATCH_SIZE).zip(embeddings.chunks(BATCH_SIZE)) {
            let (chunk_batch, embedding_batch) = batch;
            let vectors: Vec<Value> = chunk_batch
                .iter()
                .zip(embedding_batch.iter())
                .map(|(chunk, embedding)| {
                    json!({
                        "id": chunk.id,
                        "values": embedding,
                        "metadata": {
                            "document_id": chunk.document_id,
                            "chunk_index": chunk.chunk_index,
                            "content": chunk.content,
                            "tokens": chunk.tokens,
                            "category": chunk.category.as_str(),
                            "source_label": chunk.source_label,
                        }
                    })
                })
                .collect();

            let response = self
                .request(reqwest::Method::POST, "/vectors/upsert")
                .json(&json!({ "vectors": vectors }))
                .send()
                .await?
                .error_for_status()?;

            let parsed: UpsertResponse = response.json().await?;
            count += parsed.upserted_count.unwrap_or(chunk_batch.len());
        }

        Ok(count)
    }

    pub async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<RetrievalResult>, AppError> {
        let mut body = json!({
            "vector": query_vector,
            "topK": top_k,
            "includeMetadata": true,
        });
        if let Some(category) = filter.category {
            body["filter"] = json!({ "category": { "$eq": category.as_str() } });
        }

        let response = self
            .request(reqwest::Method::POST, "/query")
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let parsed: QueryResponse = response.json().await?;
        let min_similarity = filter.min_similarity.unwrap_or(0.0);

        Ok(parsed
            .matches
            .into_iter()
            .filter(|m| m.score >= min_similarity)
            .enumerate()
            .map(|(rank, m)| RetrievalResult {
                chunk: Chunk {
                    id: m.id,
                    document_id: m.metadata.document_id,
                    chunk_index: m.metadata.chunk_index,
                    content: m.metadata.content,
                    tokens: m.metadata.tokens,
                    category: Category::from_str_defaulted(&m.metadata.category),
                    source_label: m.metadata.source_label,
                    created_at: chrono::Utc::now(),
                },
                similarity_score: m.score,
                relevance_rank: rank + 1,
            })
            .collect())
    }

    pub async fn delete(&self, chunk_ids: &[String]) -> Result<usize, AppError> {
        self.request(reqwest::Method::POST, "/vectors/delete")
            .json(&json!({ "ids": chunk_ids }))
            .send()
            .await?
            .error_for_status()?;
        Ok(chunk_ids.len())
    }

    pub async fn stats(&self) -> Result<IndexStats, AppError> {
        let response = self
            .request(reqwest::Method::GET, "/describe_index_stats")
            .send()
            .await?
            .error_for_status()?;
        let parsed: StatsResponse = response.json().await?;
        Ok(IndexStats {
            chunk_count: parsed.total_vector_count.unwrap_or(0),
            dimension: parsed.dimension.unwrap_or(self.dimension),
        })
    }
}

#[derive(Debug, Deserialize)]
struct UpsertResponse {
    #[serde(rename = "upsertedCount")]
    upserted_count: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    score: f32,
    metadata: ChunkMetadata,
}

#[derive(Debug, Deserialize, Serialize)]
struct ChunkMetadata {
    document_id: String,
    chunk_index: usize,
    content: String,
    tokens: usize,
    category: String,
    source_label: String,
}

#[derive(Debug, Deserialize)]
struct StatsResponse {
    #[serde(rename = "totalVectorCount")]
    total_vector_count: Option<u64>,
    dimension: Option<usize>,
}
