mod cache;
mod local;
mod remote;

use std::sync::Mutex;
use std::time::Duration;

use common::{config::AppConfig, error::AppError};

pub use cache::EmbeddingCache;
pub use local::LocalProvider;
pub use remote::RemoteProvider;

/// Output of a batch embedding call. Vector count always equals the input
/// text count; every vector has the declared dimension.
#[derive(Debug, Clone)]
pub struct EmbedBatchOutput {
    pub vectors: Vec<Vec<f32>>,
    pub token_counts: Vec<usize>,
    pub model: String,
    pub dim: usize,
}

/// Capability interface implemented by closed, tagged backend variants
/// (§9 design note) — no runtime class hierarchy.
#[async_trait::async_trait]
pub trait EmbeddingBackend: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> Result<EmbedBatchOutput, AppError>;
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, AppError>;
    fn dimension(&self) -> usize;
    fn backend_label(&self) -> &'static str;
    async fn close(&self);
}

enum Backend {
    Remote(RemoteProvider),
    Local(LocalProvider),
}

/// Provider selection is sticky for the service lifetime: configuration
/// enumerates preferred backends in order, construction falls through on
/// failure, and the chosen backend is never re-selected per call.
///
/// Wraps an optional LRU keyed by `(model, text)` (C3): `embed_batch` and
/// `embed_query` consult it before calling the backend and populate it with
/// whatever the backend returns. A zero-capacity cache disables caching.
pub struct EmbeddingProvider {
    backend: Backend,
    cache: Option<Mutex<EmbeddingCache>>,
}

impl EmbeddingProvider {
    pub async fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let backend = Self::select_backend(config).await?;
        let cache = (config.embedding_cache_capacity > 0).then(|| {
            Mutex::new(EmbeddingCache::new(
                config.embedding_cache_capacity,
                Duration::from_secs(config.embedding_cache_ttl),
            ))
        });
        Ok(Self { backend, cache })
    }

    async fn select_backend(config: &AppConfig) -> Result<Backend, AppError> {
        for backend in &config.embedding_backend_order {
            match backend.as_str() {
                "remote" => match RemoteProvider::new(config) {
                    Ok(provider) => return Ok(Backend::Remote(provider)),
                    Err(err) => {
                        tracing::warn!(error = %err, "remote embedding provider construction failed, trying next backend");
                    }
                },
                "local" => match LocalProvider::new(config) {
                    Ok(provider) => return Ok(Backend::Local(provider)),
                    Err(err) => {
                        tracing::warn!(error = %err, "local embedding provider construction failed, trying next backend");
                    }
                },
                other => {
                    tracing::warn!(backend = other, "unrecognized embedding backend, skipping");
                }
            }
        }
        Err(AppError::Configuration(
            "no embedding provider could be constructed from embedding_backend_order".into(),
        ))
    }

    /// Wraps an already-constructed remote backend with no cache. Used by
    /// tests and callers that build the backend directly.
    pub fn remote(provider: RemoteProvider) -> Self {
        Self {
            backend: Backend::Remote(provider),
            cache: None,
        }
    }

    /// Wraps an already-constructed local backend with no cache. Used by
    /// tests and callers that build the backend directly.
    pub fn local(provider: LocalProvider) -> Self {
        Self {
            backend: Backend::Local(provider),
            cache: None,
        }
    }

    pub fn dimension(&self) -> usize {
        match &self.backend {
            Backend::Remote(p) => p.dimension(),
            Backend::Local(p) => p.dimension(),
        }
    }

    pub fn backend_label(&self) -> &'static str {
        match &self.backend {
            Backend::Remote(p) => p.backend_label(),
            Backend::Local(p) => p.backend_label(),
        }
    }

    fn model_name(&self) -> &str {
        match &self.backend {
            Backend::Remote(p) => p.model_name(),
            Backend::Local(p) => p.model_name(),
        }
    }

    async fn embed_batch_uncached(&self, texts: &[String]) -> Result<EmbedBatchOutput, AppError> {
        match &self.backend {
            Backend::Remote(p) => p.embed_batch(texts).await,
            Backend::Local(p) => p.embed_batch(texts).await,
        }
    }

    async fn embed_query_uncached(&self, text: &str) -> Result<Vec<f32>, AppError> {
        match &self.backend {
            Backend::Remote(p) => p.embed_query(text).await,
            Backend::Local(p) => p.embed_query(text).await,
        }
    }

    /// Partitions `texts` into cache hits and misses, calls the backend only
    /// for the misses, and splices the results back by original index.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<EmbedBatchOutput, AppError> {
        let Some(cache_lock) = &self.cache else {
            return self.embed_batch_uncached(texts).await;
        };
        if texts.is_empty() {
            return self.embed_batch_uncached(texts).await;
        }

        let model = self.model_name().to_string();
        let mut vectors: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        let mut miss_indices = Vec::new();
        let mut miss_texts = Vec::new();

        {
            let mut cache = cache_lock
                .lock()
                .map_err(|_| AppError::Embedding("embedding cache mutex was poisoned".into()))?;
            for (idx, text) in texts.iter().enumerate() {
                match cache.get(&model, text) {
                    Some(vector) => vectors[idx] = Some(vector),
                    None => {
                        miss_indices.push(idx);
                        miss_texts.push(text.clone());
                    }
                }
            }
        }

        if !miss_texts.is_empty() {
            let fetched = self.embed_batch_uncached(&miss_texts).await?;
            let mut cache = cache_lock
                .lock()
                .map_err(|_| AppError::Embedding("embedding cache mutex was poisoned".into()))?;
            for (miss_pos, &original_idx) in miss_indices.iter().enumerate() {
                let vector = fetched.vectors[miss_pos].clone();
                cache.set(&model, &miss_texts[miss_pos], vector.clone());
                vectors[original_idx] = Some(vector);
            }
        }

        let dim = self.dimension();
        let resolved: Vec<Vec<f32>> = vectors.into_iter().map(Option::unwrap_or_default).collect();
        let token_counts = texts.iter().map(|t| chunking::estimate_tokens(t)).collect();

        Ok(EmbedBatchOutput {
            vectors: resolved,
            token_counts,
            model,
            dim,
        })
    }

    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>, AppError> {
        let Some(cache_lock) = &self.cache else {
            return self.embed_query_uncached(text).await;
        };

        let model = self.model_name().to_string();
        {
            let mut cache = cache_lock
                .lock()
                .map_err(|_| AppError::Embedding("embedding cache mutex was poisoned".into()))?;
            if let Some(vector) = cache.get(&model, text) {
                return Ok(vector);
            }
        }

        let vector = self.embed_query_uncached(text).await?;
        let mut cache = cache_lock
            .lock()
            .map_err(|_| AppError::Embedding("embedding cache mutex was poisoned".into()))?;
        cache.set(&model, text, vector.clone());
        Ok(vector)
    }

    pub async fn close(&self) {
        match &self.backend {
            Backend::Remote(p) => p.close().await,
            Backend::Local(p) => p.close().await,
        }
    }
}

/// Pre-truncates any single text whose character length exceeds
/// `3 * max_tokens` (conservative BPE ratio), preferring a trailing
/// whitespace boundary within the last 10% of the kept prefix.
pub fn truncate_for_embedding(text: &str, max_tokens: usize) -> String {
    let max_chars = max_tokens.saturating_mul(3);
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_chars {
        return text.to_string();
    }

    let boundary_window_start = max_chars.saturating_sub(max_chars / 10);
    let mut cut = max_chars;
    for idx in (boundary_window_start..max_chars).rev() {
        if chars[idx].is_whitespace() {
            cut = idx;
            break;
        }
    }

    chars[..cut].iter().collect::<String>().trim().to_string()
}

/// L2-normalizes `vector` in place; a zero vector is left untouched.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_leaves_short_text_untouched() {
        assert_eq!(truncate_for_embedding("short text", 100), "short text");
    }

    #[test]
    fn truncate_prefers_whitespace_boundary() {
        let text = "a".repeat(30) + " " + &"b".repeat(30);
        let truncated = truncate_for_embedding(&text, 10);
        assert!(truncated.chars().count() <= 30);
        assert!(!truncated.ends_with(' '));
    }

    #[test]
    fn l2_normalize_produces_unit_norm_for_nonzero_vectors() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn l2_normalize_preserves_zero_vectors() {
        let mut v = vec![0.0, 0.0];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0]);
    }
}
