pub mod config;
pub mod pipeline;

pub use config::{RetrievalConfig, RetrievalStrategy, RetrievalTuning};
pub use pipeline::{PipelineStageTimings, SemanticRetrievalDriver, StageKind};
