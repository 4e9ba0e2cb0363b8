use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Single immutable configuration struct threaded through every constructor.
/// Loaded once at startup; nothing on the hot path consults a global.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    // --- HTTP binding (C10) ---
    pub api_host: String,
    pub api_port: u16,
    pub cors_origins: Vec<String>,

    // --- Log sinks (C9) ---
    pub mongodb_url: Option<String>,
    pub mongodb_database: String,
    pub mongodb_collection_logs: String,
    pub mongodb_collection_safety: String,
    pub log_sink_queue_capacity: usize,

    // --- Vector index (C4) ---
    pub chroma_persist_directory: Option<String>,
    pub chroma_collection_name: String,
    pub pinecone_api_key: Option<String>,
    pub pinecone_environment: Option<String>,
    pub pinecone_index_name: Option<String>,

    // --- Embedding provider (C3) ---
    pub embedding_dimension: usize,
    pub embedding_backend_order: Vec<String>,
    pub nvidia_embedding_api_key: Option<String>,
    pub nvidia_embedding_base_url: Option<String>,
    pub nvidia_embedding_model: String,
    pub local_embedding_model: String,

    // --- LLM provider (C7) ---
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub nvidia_llm_api_key: Option<String>,
    pub nvidia_llm_base_url: Option<String>,
    pub nvidia_llm_model: Option<String>,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
    pub llm_timeout_secs: u64,
    pub embedding_timeout_secs: u64,

    // --- Chunking & retrieval (C1, C2, C6) ---
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub chunk_min_size: usize,
    pub chunk_max_size: usize,
    pub max_chunks_per_query: usize,
    pub default_min_similarity: f32,

    // --- Caches (C3) ---
    pub redis_url: Option<String>,
    pub cache_ttl: u64,
    pub embedding_cache_ttl: u64,
    pub embedding_cache_capacity: usize,

    // --- Rate limiting (C8) ---
    pub rate_limit_requests: u32,
    pub rate_limit_window: u64,

    // --- Safety (C5) ---
    pub safety_enabled: bool,
    pub medical_advice_threshold: f32,
    pub crisis_detection_threshold: f32,

    pub debug: bool,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_host: "0.0.0.0".into(),
            api_port: 8080,
            cors_origins: Vec::new(),

            mongodb_url: None,
            mongodb_database: "wellness_rag".into(),
            mongodb_collection_logs: "interaction_logs".into(),
            mongodb_collection_safety: "safety_incidents".into(),
            log_sink_queue_capacity: 1024,

            chroma_persist_directory: Some("./data/chroma".into()),
            chroma_collection_name: "yoga_wellness".into(),
            pinecone_api_key: None,
            pinecone_environment: None,
            pinecone_index_name: None,

            embedding_dimension: 384,
            embedding_backend_order: vec!["remote".into(), "local".into()],
            nvidia_embedding_api_key: None,
            nvidia_embedding_base_url: None,
            nvidia_embedding_model: "nvidia/nv-embed-v1".into(),
            local_embedding_model: "sentence-transformers/all-MiniLM-L6-v2".into(),

            openai_api_key: String::new(),
            openai_base_url: "https://api.openai.com/v1".into(),
            openai_model: "gpt-4o-mini".into(),
            nvidia_llm_api_key: None,
            nvidia_llm_base_url: None,
            nvidia_llm_model: None,
            llm_temperature: 0.3,
            llm_max_tokens: 512,
            llm_timeout_secs: 60,
            embedding_timeout_secs: 30,

            chunk_size: 512,
            chunk_overlap: 50,
            chunk_min_size: 100,
            chunk_max_size: 800,
            max_chunks_per_query: 5,
            default_min_similarity: 0.7,

            redis_url: None,
            cache_ttl: 3600,
            embedding_cache_ttl: 3600,
            embedding_cache_capacity: 10_000,

            rate_limit_requests: 60,
            rate_limit_window: 60,

            safety_enabled: true,
            medical_advice_threshold: 0.7,
            crisis_detection_threshold: 0.9,

            debug: false,
            log_level: "info".into(),
        }
    }
}

impl AppConfig {
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(self.embedding_timeout_secs)
    }
}

/// Layered load: compiled-in defaults, then an optional `config/default.toml`,
/// then `APP_`-prefixed environment variables with `__` as the nesting separator.
pub fn get_config() -> Result<AppConfig, AppError> {
    let defaults = Config::try_from(&AppConfig::default())
        .map_err(|e| AppError::Configuration(format!("failed to seed defaults: {e}")))?;

    let config = Config::builder()
        .add_source(defaults)
        .add_source(File::with_name("config/default").required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    config
        .try_deserialize()
        .map_err(|e| AppError::Configuration(format!("failed to deserialize config: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_internally_consistent() {
        let config = AppConfig::default();
        assert!(config.chunk_min_size < config.chunk_size);
        assert!(config.chunk_size < config.chunk_max_size);
        assert!(config.chunk_overlap < config.chunk_min_size);
    }

    #[test]
    fn get_config_succeeds_with_no_environment_overrides() {
        let config = get_config().expect("defaults alone should deserialize");
        assert_eq!(config.api_port, 8080);
    }
}
