use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use chunking::{chunk_document_with_stats, ChunkerConfig};
use common::config::{get_config, AppConfig};
use common::storage::db::SurrealDbClient;
use common::types::{Category, Document};
use embedding_provider::EmbeddingProvider;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vector_index::{EmbeddedIndex, RemoteIndex, VectorIndex};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let corpus_dir = std::env::args().nth(1).unwrap_or_else(|| "corpus".to_string());
    let config = get_config()?;

    let index = build_vector_index(&config).await?;
    index.initialize().await?;
    let embedding_provider = EmbeddingProvider::from_config(&config).await?;
    let chunker_config = chunker_config_from(&config);

    let documents = load_corpus(Path::new(&corpus_dir))?;
    info!(corpus_dir, documents = documents.len(), "starting ingestion run");

    let started = Instant::now();
    let mut chunks_emitted = 0usize;
    let mut chunks_dropped_by_validation = 0usize;

    for document in &documents {
        let (chunks, stats) = chunk_document_with_stats(document, &chunker_config);
        chunks_dropped_by_validation += stats.dropped_by_validation;
        if chunks.is_empty() {
            continue;
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.content.clone()).collect();
        let embeddings = match embedding_provider.embed_batch(&texts).await {
            Ok(output) => output.vectors,
            Err(err) => {
                warn!(document_id = %document.id, error = %err, "embedding call failed, substituting zero vectors");
                vec![vec![0.0; embedding_provider.dimension()]; chunks.len()]
            }
        };

        match index.upsert(&chunks, &embeddings).await {
            Ok(written) => chunks_emitted += written,
            Err(err) => warn!(document_id = %document.id, error = %err, "upsert failed, document skipped"),
        }
    }

    info!(
        documents = documents.len(),
        chunks_emitted,
        chunks_dropped_by_validation,
        elapsed_ms = started.elapsed().as_millis(),
        "ingestion run finished"
    );

    Ok(())
}

fn chunker_config_from(config: &AppConfig) -> ChunkerConfig {
    ChunkerConfig {
        target_tokens: config.chunk_size,
        overlap_tokens: config.chunk_overlap,
        min_tokens: config.chunk_min_size,
        max_tokens: config.chunk_max_size,
    }
}

async fn build_vector_index(config: &AppConfig) -> anyhow::Result<VectorIndex> {
    if config.pinecone_api_key.is_some() && config.pinecone_environment.is_some() && config.pinecone_index_name.is_some()
    {
        return Ok(VectorIndex::Remote(RemoteIndex::new(config)?));
    }

    let db = SurrealDbClient::memory("wellness_rag", &config.chroma_collection_name).await?;
    Ok(VectorIndex::Embedded(EmbeddedIndex::new(db, config.embedding_dimension)))
}

/// One `Document` per `.txt`/`.md` file directly under `root`'s immediate
/// subdirectories; a file's parent directory name is taken as its category,
/// defaulting to `wellness` when it doesn't match a known one.
fn load_corpus(root: &Path) -> anyhow::Result<Vec<Document>> {
    let mut documents = Vec::new();
    visit(root, root, &mut documents).with_context(|| format!("reading corpus directory {}", root.display()))?;
    Ok(documents)
}

fn visit(root: &Path, dir: &Path, documents: &mut Vec<Document>) -> anyhow::Result<()> {
    let entries = std::fs::read_dir(dir).with_context(|| format!("reading directory {}", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            visit(root, &path, documents)?;
            continue;
        }

        let is_text = matches!(path.extension().and_then(|ext| ext.to_str()), Some("txt") | Some("md"));
        if !is_text {
            continue;
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => documents.push(Document::new(
                document_id(root, &path),
                content,
                category_for(root, &path),
                source_label(&path),
            )),
            Err(err) => warn!(path = %path.display(), error = %err, "skipping unreadable document"),
        }
    }
    Ok(())
}

fn document_id(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace(std::path::MAIN_SEPARATOR, "_")
}

fn category_for(root: &Path, path: &Path) -> Category {
    path.strip_prefix(root)
        .ok()
        .and_then(|relative| relative.components().next())
        .and_then(|component| component.as_os_str().to_str())
        .map(Category::from_str_defaulted)
        .unwrap_or(Category::Wellness)
}

fn source_label(path: &Path) -> String {
    path.file_stem().map(|stem| stem.to_string_lossy().into_owned()).unwrap_or_else(|| path.to_string_lossy().into_owned())
}

