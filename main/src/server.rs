use std::sync::Arc;

use api::{api_routes_v1, api_state::ApiState};
use axum::Router;
use common::config::{get_config, AppConfig};
use common::storage::db::SurrealDbClient;
use embedding_provider::EmbeddingProvider;
use orchestrator::Orchestrator;
use retrieval_pipeline::SemanticRetrievalDriver;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vector_index::{EmbeddedIndex, RemoteIndex, VectorIndex};

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let config = get_config()?;

    let index = build_vector_index(&config).await?;
    index.initialize().await?;

    let embedding_provider = EmbeddingProvider::from_config(&config).await?;
    info!(
        backend = embedding_provider.backend_label(),
        dimension = embedding_provider.dimension(),
        "embedding provider initialized"
    );

    let retrieval = SemanticRetrievalDriver::new(embedding_provider, index);
    let orchestrator = Arc::new(Orchestrator::from_config(&config, retrieval));
    let api_state = ApiState::new(orchestrator, config.clone());

    let app = Router::new()
        .nest("/api/v1", api_routes_v1(&api_state))
        .with_state(api_state);

    let serve_address = format!("{}:{}", config.api_host, config.api_port);
    info!(address = %serve_address, "starting server");
    let listener = tokio::net::TcpListener::bind(&serve_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Pinecone wins when all three of its fields are configured; otherwise the
/// embedded SurrealDB-backed index runs in-process, matching the feature set
/// (`kv-mem` only) the workspace actually compiles `surrealdb` with.
async fn build_vector_index(config: &AppConfig) -> Result<VectorIndex, Box<dyn std::error::Error>> {
    if config.pinecone_api_key.is_some() && config.pinecone_environment.is_some() && config.pinecone_index_name.is_some()
    {
        return Ok(VectorIndex::Remote(RemoteIndex::new(config)?));
    }

    let db = SurrealDbClient::memory("wellness_rag", &config.chroma_collection_name).await?;
    Ok(VectorIndex::Embedded(EmbeddedIndex::new(db, config.embedding_dimension)))
}
