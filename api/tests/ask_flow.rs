use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt;

use api::{api_routes_v1, api_state::ApiState};
use common::config::AppConfig;
use embedding_provider::{EmbeddingProvider, RemoteProvider};
use orchestrator::Orchestrator;
use retrieval_pipeline::SemanticRetrievalDriver;
use uuid::Uuid;
use vector_index::{EmbeddedIndex, VectorIndex};

async fn build_app_with(configure: impl FnOnce(&mut AppConfig)) -> Router {
    let database = Uuid::new_v4().to_string();
    let db = common::storage::db::SurrealDbClient::memory("api_tests", &database)
        .await
        .expect("in-memory db");
    let index = VectorIndex::Embedded(EmbeddedIndex::new(db, 3));
    index.initialize().await.expect("index init");

    let mut config = AppConfig::default();
    config.embedding_dimension = 3;
    config.nvidia_embedding_base_url = Some("http://127.0.0.1:0".into());
    configure(&mut config);

    let embedding_provider = EmbeddingProvider::remote(RemoteProvider::new(&config).expect("remote provider"));
    let retrieval = SemanticRetrievalDriver::new(embedding_provider, index);

    let orchestrator = Arc::new(Orchestrator::from_config(&config, retrieval));
    let state = ApiState::new(orchestrator, config);

    Router::new().nest("/api/v1", api_routes_v1(&state)).with_state(state)
}

async fn build_app() -> Router {
    build_app_with(|_| {}).await
}

#[tokio::test]
async fn health_endpoint_reports_healthy() {
    let app = build_app().await;

    let response = app
        .oneshot(Request::builder().uri("/api/v1/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unsafe_query_is_blocked_before_retrieval() {
    let app = build_app().await;

    let body = serde_json::json!({
        "query": "I am having a heart attack, what pose should I do?",
    });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/ask")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn empty_query_is_rejected_with_400() {
    let app = build_app().await;

    let body = serde_json::json!({ "query": "" });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/ask")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn a_client_past_the_rate_limit_gets_429() {
    let app = build_app_with(|config| {
        config.rate_limit_requests = 2;
        config.rate_limit_window = 60;
    })
    .await;

    let body = serde_json::json!({ "query": "what is yoga?", "user_id": "same-client" });
    let make_request = || {
        Request::builder()
            .method("POST")
            .uri("/api/v1/ask")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    };

    let first = app.clone().oneshot(make_request()).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let second = app.clone().oneshot(make_request()).await.unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    let third = app.oneshot(make_request()).await.unwrap();
    assert_eq!(third.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn feedback_endpoint_acknowledges_the_rating() {
    let app = build_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/feedback?query_id=abc-123&feedback=helpful")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
