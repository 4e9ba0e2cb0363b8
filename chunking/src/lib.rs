mod chunker;
mod normalize;
mod tokens;

pub use chunker::{chunk_document, chunk_document_with_stats, ChunkerConfig, ChunkingStats};
pub use normalize::normalize;
pub use tokens::estimate_tokens;
