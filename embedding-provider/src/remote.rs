use common::config::AppConfig;
use common::error::AppError;
use serde::Deserialize;
use serde_json::json;

use crate::{truncate_for_embedding, EmbedBatchOutput, EmbeddingBackend};

/// HTTP embedding backend for an NVIDIA-NIM-shaped embeddings endpoint.
/// Accepts either OpenAI-style `{ data: [{ embedding }] }` responses or a
/// bare `{ embeddings: [[f32]] }` shape, since operators have been observed
/// pointing `nvidia_embedding_base_url` at either kind of gateway.
pub struct RemoteProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    dimension: usize,
    max_input_tokens: usize,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EmbeddingResponse {
    OpenAiShaped { data: Vec<OpenAiEmbeddingItem> },
    BareVectors { embeddings: Vec<Vec<f32>> },
}

#[derive(Deserialize)]
struct OpenAiEmbeddingItem {
    embedding: Vec<f32>,
}

impl RemoteProvider {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        let base_url = config
            .nvidia_embedding_base_url
            .clone()
            .ok_or_else(|| AppError::Configuration("nvidia_embedding_base_url is not set".into()))?;

        let client = reqwest::Client::builder()
            .timeout(config.embedding_timeout())
            .build()
            .map_err(AppError::from)?;

        Ok(Self {
            client,
            base_url,
            api_key: config.nvidia_embedding_api_key.clone(),
            model: config.nvidia_embedding_model.clone(),
            dimension: config.embedding_dimension,
            max_input_tokens: 8192,
        })
    }

    async fn embed(&self, texts: &[String]) -> Result<EmbedBatchOutput, AppError> {
        let truncated: Vec<String> = texts
            .iter()
            .map(|t| truncate_for_embedding(t, self.max_input_tokens))
            .collect();

        let url = format!("{}/embeddings", self.base_url.trim_end_matches('/'));
        let mut request = self.client.post(&url).json(&json!({
            "model": self.model,
            "input": truncated,
        }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let response = response.error_for_status()?;
        let parsed: EmbeddingResponse = response.json().await?;

        let vectors = match parsed {
            EmbeddingResponse::OpenAiShaped { data } => {
                data.into_iter().map(|item| item.embedding).collect::<Vec<_>>()
            }
            EmbeddingResponse::BareVectors { embeddings } => embeddings,
        };

        if vectors.len() != texts.len() {
            return Err(AppError::Embedding(format!(
                "remote provider returned {} vectors for {} inputs",
                vectors.len(),
                texts.len()
            )));
        }

        let token_counts = truncated.iter().map(|t| chunking::estimate_tokens(t)).collect();

        Ok(EmbedBatchOutput {
            vectors,
            token_counts,
            model: self.model.clone(),
            dim: self.dimension,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn backend_label(&self) -> &'static str {
        "remote"
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    pub async fn embed_batch(&self, texts: &[String]) -> Result<EmbedBatchOutput, AppError> {
        self.embed(texts).await
    }

    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>, AppError> {
        let output = self.embed(std::slice::from_ref(&text.to_string())).await?;
        output
            .vectors
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Embedding("remote provider returned no vector".into()))
    }

    pub async fn close(&self) {}
}

#[async_trait::async_trait]
impl EmbeddingBackend for RemoteProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<EmbedBatchOutput, AppError> {
        RemoteProvider::embed_batch(self, texts).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, AppError> {
        RemoteProvider::embed_query(self, text).await
    }

    fn dimension(&self) -> usize {
        RemoteProvider::dimension(self)
    }

    fn backend_label(&self) -> &'static str {
        RemoteProvider::backend_label(self)
    }

    async fn close(&self) {
        RemoteProvider::close(self).await
    }
}
