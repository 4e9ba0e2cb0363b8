use std::sync::Mutex;

use common::config::AppConfig;
use common::error::AppError;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use crate::{l2_normalize, truncate_for_embedding, EmbedBatchOutput, EmbeddingBackend};

/// On-device embedding backend, used when no remote provider is configured
/// or the remote provider failed to construct. Runs inference on a blocking
/// thread since the underlying ONNX session call is synchronous.
pub struct LocalProvider {
    model: Mutex<TextEmbedding>,
    model_name: String,
    dimension: usize,
    max_input_tokens: usize,
}

impl LocalProvider {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        let model_variant = resolve_model(&config.local_embedding_model)?;

        let model = TextEmbedding::try_new(
            InitOptions::new(model_variant).with_show_download_progress(false),
        )
        .map_err(|e| AppError::Embedding(format!("failed to load local embedding model: {e}")))?;

        Ok(Self {
            model: Mutex::new(model),
            model_name: config.local_embedding_model.clone(),
            dimension: config.embedding_dimension,
            max_input_tokens: 512,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn backend_label(&self) -> &'static str {
        "local"
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub async fn embed_batch(&self, texts: &[String]) -> Result<EmbedBatchOutput, AppError> {
        let truncated: Vec<String> = texts
            .iter()
            .map(|t| truncate_for_embedding(t, self.max_input_tokens))
            .collect();
        let token_counts = truncated.iter().map(|t| chunking::estimate_tokens(t)).collect();

        let model_name = self.model_name.clone();
        let owned_texts = truncated;
        let vectors = self.run_blocking(owned_texts).await?;

        Ok(EmbedBatchOutput {
            vectors,
            token_counts,
            model: model_name,
            dim: self.dimension,
        })
    }

    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>, AppError> {
        let truncated = truncate_for_embedding(text, self.max_input_tokens);
        let vectors = self.run_blocking(vec![truncated]).await?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Embedding("local provider returned no vector".into()))
    }

    async fn run_blocking(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, AppError> {
        // ONNX inference is CPU-bound and synchronous; run it without
        // yielding the worker thread back to the async scheduler.
        tokio::task::block_in_place(|| {
            let guard = self.model.lock().map_err(|_| {
                AppError::Embedding("local embedding model mutex was poisoned".into())
            })?;

            let mut vectors = guard
                .embed(texts, None)
                .map_err(|e| AppError::Embedding(format!("local embedding inference failed: {e}")))?;

            for vector in &mut vectors {
                l2_normalize(vector);
            }

            Ok(vectors)
        })
    }

    pub async fn close(&self) {}
}

#[async_trait::async_trait]
impl EmbeddingBackend for LocalProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<EmbedBatchOutput, AppError> {
        LocalProvider::embed_batch(self, texts).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, AppError> {
        LocalProvider::embed_query(self, text).await
    }

    fn dimension(&self) -> usize {
        LocalProvider::dimension(self)
    }

    fn backend_label(&self) -> &'static str {
        LocalProvider::backend_label(self)
    }

    async fn close(&self) {
        LocalProvider::close(self).await
    }
}

fn resolve_model(name: &str) -> Result<EmbeddingModel, AppError> {
    match name {
        "sentence-transformers/all-MiniLM-L6-v2" | "AllMiniLML6V2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "BAAI/bge-small-en-v1.5" | "BGESmallENV15" => Ok(EmbeddingModel::BGESmallENV15),
        "BAAI/bge-base-en-v1.5" | "BGEBaseENV15" => Ok(EmbeddingModel::BGEBaseENV15),
        other => Err(AppError::Configuration(format!(
            "unrecognized local_embedding_model: {other}"
        ))),
    }
}
