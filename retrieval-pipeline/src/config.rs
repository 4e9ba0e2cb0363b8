use common::config::AppConfig;

/// Retrieval strategy selector. Sealed to a single variant: the service only
/// ever performs dense semantic search over the configured vector index.
///
/// TODO: a `Hybrid` variant (dense search fused with lexical/full-text
/// scoring) would slot in here once a full-text backend is wired up; no such
/// backend exists yet so the enum stays closed rather than carrying a
/// variant nothing can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalStrategy {
    Semantic,
}

impl Default for RetrievalStrategy {
    fn default() -> Self {
        RetrievalStrategy::Semantic
    }
}

/// Tunable knobs for one retrieval call, seeded from configuration defaults
/// and overridable per request.
#[derive(Debug, Clone)]
pub struct RetrievalTuning {
    pub max_results: usize,
    pub min_similarity: f32,
}

impl RetrievalTuning {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_results: config.max_chunks_per_query,
            min_similarity: config.default_min_similarity,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_min_similarity(mut self, min_similarity: f32) -> Self {
        self.min_similarity = min_similarity;
        self
    }
}

/// Wraps a strategy selection with its tuning. Constructors mirror the
/// teacher's `RetrievalConfig::for_chat`/`for_ingestion` shape, narrowed to
/// the single strategy this service drives.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub strategy: RetrievalStrategy,
    pub tuning: RetrievalTuning,
}

impl RetrievalConfig {
    pub fn new(tuning: RetrievalTuning) -> Self {
        Self {
            strategy: RetrievalStrategy::Semantic,
            tuning,
        }
    }

    pub fn for_query(config: &AppConfig) -> Self {
        Self::new(RetrievalTuning::from_config(config))
    }
}
