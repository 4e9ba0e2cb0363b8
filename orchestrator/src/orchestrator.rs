use std::time::Instant;

use common::config::AppConfig;
use common::error::AppError;
use common::types::{
    GeneratedResponse, InteractionLogRecord, RetrievalResult, SafetyAssessment,
    SafetyIncidentRecord, SourceCitation,
};
use retrieval_pipeline::{RetrievalConfig, RetrievalTuning, SemanticRetrievalDriver};
use state_machines::core::GuardError;

use crate::context::QueryContext;
use crate::llm::LlmClient;
use crate::rate_limit::RateLimiter;
use crate::response::QueryResponse;
use crate::sinks::LoggingSinks;
use crate::state::admitted;

/// Every transition below is unconditional given the linear
/// ADMIT → … → RESPOND flow, so a guard rejection here means an internal
/// invariant was violated, not a normal outcome. Turned into an `AppError`
/// so `run_query` can bail with `?` and `handle_query` degrades the
/// response the same way it does for every other downstream failure.
fn map_guard_error(event: &str, guard: &GuardError) -> AppError {
    tracing::error!(event, ?guard, "orchestrator state machine rejected an unconditional transition");
    AppError::Internal(format!("invalid orchestrator transition during {event}: {guard:?}"))
}

const SYSTEM_PROMPT_PREFACE: &str = "You are a wellness assistant answering questions about yoga, \
meditation, nutrition, and exercise. Answer using only the sources below. If the sources do not \
contain enough information to answer, say so plainly instead of guessing.";

const REFUSAL_PREFACE: &str = "I cannot answer this query due to safety guidelines. ";

/// Parameters for one `/ask` call, already validated by the HTTP binding.
pub struct AskRequest {
    pub query: String,
    pub max_chunks: usize,
    pub min_similarity: f32,
    pub session_id: Option<String>,
}

/// Wires the collaborators built at startup and drives one query through
/// the ADMIT → SAFETY → {BLOCKED | RETRIEVE} → GENERATE → LOG → RESPOND
/// state machine. Owns no cyclic references: every collaborator is handed
/// in at construction and never hands a callback back.
pub struct Orchestrator {
    retrieval: SemanticRetrievalDriver,
    llm: LlmClient,
    rate_limiter: RateLimiter,
    sinks: LoggingSinks,
}

impl Orchestrator {
    pub fn new(
        retrieval: SemanticRetrievalDriver,
        llm: LlmClient,
        rate_limiter: RateLimiter,
        sinks: LoggingSinks,
    ) -> Self {
        Self {
            retrieval,
            llm,
            rate_limiter,
            sinks,
        }
    }

    pub fn from_config(config: &AppConfig, retrieval: SemanticRetrievalDriver) -> Self {
        Self::new(
            retrieval,
            LlmClient::from_config(config),
            RateLimiter::from_config(config),
            LoggingSinks::new(config.log_sink_queue_capacity),
        )
    }

    /// Fixed-window admission check (C8), sitting ahead of the query state
    /// machine. A rejection here fails the request before `query_id` is even
    /// assigned; it is the only non-validation path allowed to do so.
    pub async fn admit(&self, client_id: Option<&str>) -> bool {
        self.rate_limiter.admit(client_id).await
    }

    /// Drives one query end to end. Always returns a response: a failure
    /// anywhere past admission degrades into an apologetic answer rather
    /// than propagating, per the error-handling policy every other
    /// component in this crate follows.
    #[tracing::instrument(skip(self, request), fields(max_chunks = request.max_chunks))]
    pub async fn handle_query(&self, request: AskRequest) -> QueryResponse {
        let ctx = QueryContext::new(
            request.query,
            request.session_id,
            request.max_chunks,
            request.min_similarity,
        );

        match self.run_query(&ctx).await {
            Ok(response) => response,
            Err(err) => self.degraded_response(&ctx, err),
        }
    }

    fn degraded_response(&self, ctx: &QueryContext, err: AppError) -> QueryResponse {
        let err = ctx.abort(err);
        tracing::error!(query_id = %ctx.query_id, error = %err, "query failed before a response could be produced");

        QueryResponse {
            query: ctx.query.clone(),
            response: GeneratedResponse {
                content: "I'm sorry, something went wrong while handling your question. Please try again shortly."
                    .to_string(),
                sources: Vec::new(),
                confidence: 0.0,
                safety_notices: Vec::new(),
            },
            retrieval_results: Vec::new(),
            safety_assessment: SafetyAssessment::permissive(),
            processing_time_ms: ctx.elapsed_ms(),
            session_id: ctx.session_id.clone(),
        }
    }

    async fn run_query(&self, ctx: &QueryContext) -> Result<QueryResponse, AppError> {
        let machine = admitted();

        let safety_start = Instant::now();
        let assessment = safety_classifier::classify(&ctx.query);
        let safety_ms = safety_start.elapsed().as_millis();
        let machine = machine
            .check_safety()
            .map_err(|(_, guard)| map_guard_error("check_safety", &guard))?;

        if !assessment.allow_response {
            let machine = machine
                .block()
                .map_err(|(_, guard)| map_guard_error("block", &guard))?;

            let mut content = REFUSAL_PREFACE.to_string();
            content.push_str(&assessment.required_disclaimers.join(" "));

            let response = GeneratedResponse {
                content,
                sources: Vec::new(),
                confidence: 0.0,
                safety_notices: assessment.required_disclaimers.clone(),
            };

            self.sinks.safety_incidents.enqueue(SafetyIncidentRecord {
                id: ctx.query_id.to_string(),
                query_id: ctx.query_id,
                session_id: ctx.session_id.clone(),
                query: ctx.query.clone(),
                assessment: assessment.clone(),
                created_at: chrono::Utc::now(),
            });

            let machine = machine
                .log_incident()
                .map_err(|(_, guard)| map_guard_error("log_incident", &guard))?;
            let _machine = machine
                .respond()
                .map_err(|(_, guard)| map_guard_error("respond", &guard))?;

            let processing_time_ms = ctx.elapsed_ms();
            tracing::info!(
                query_id = %ctx.query_id,
                session_id = %ctx.session_id,
                safety_ms,
                processing_time_ms,
                "query blocked by safety classifier"
            );

            return Ok(QueryResponse {
                query: ctx.query.clone(),
                response,
                retrieval_results: Vec::new(),
                safety_assessment: assessment,
                processing_time_ms,
                session_id: ctx.session_id.clone(),
            });
        }

        let machine = machine
            .retrieve()
            .map_err(|(_, guard)| map_guard_error("retrieve", &guard))?;

        let retrieval_config = RetrievalConfig::new(RetrievalTuning {
            max_results: ctx.max_results,
            min_similarity: ctx.min_similarity,
        });
        let retrieve_start = Instant::now();
        let retrieval_results = match self.retrieval.retrieve(&ctx.query, &retrieval_config).await {
            Ok((results, _timings)) => results,
            Err(err) => {
                tracing::warn!(error = %err, query_id = %ctx.query_id, "retrieval failed, continuing with empty context");
                Vec::new()
            }
        };
        let retrieve_ms = retrieve_start.elapsed().as_millis();

        let machine = machine
            .generate()
            .map_err(|(_, guard)| map_guard_error("generate", &guard))?;

        let generate_start = Instant::now();
        let response = self.generate(ctx, &assessment, &retrieval_results).await;
        let generate_ms = generate_start.elapsed().as_millis();

        let machine = machine
            .log()
            .map_err(|(_, guard)| map_guard_error("log", &guard))?;

        self.sinks.interactions.enqueue(InteractionLogRecord {
            id: ctx.query_id.to_string(),
            query_id: ctx.query_id,
            session_id: ctx.session_id.clone(),
            query: ctx.query.clone(),
            response_content: response.content.clone(),
            confidence: response.confidence,
            retrieval_count: retrieval_results.len(),
            processing_time_ms: ctx.elapsed_ms(),
            created_at: chrono::Utc::now(),
        });

        let _machine = machine
            .respond()
            .map_err(|(_, guard)| map_guard_error("respond", &guard))?;

        let processing_time_ms = ctx.elapsed_ms();
        tracing::info!(
            query_id = %ctx.query_id,
            session_id = %ctx.session_id,
            safety_ms,
            retrieve_ms,
            generate_ms,
            processing_time_ms,
            retrieval_count = retrieval_results.len(),
            "query finished"
        );

        Ok(QueryResponse {
            query: ctx.query.clone(),
            response,
            retrieval_results,
            safety_assessment: assessment,
            processing_time_ms,
            session_id: ctx.session_id.clone(),
        })
    }

    async fn generate(
        &self,
        ctx: &QueryContext,
        assessment: &SafetyAssessment,
        retrieval_results: &[RetrievalResult],
    ) -> GeneratedResponse {
        let sources = retrieval_results
            .iter()
            .map(|result| {
                format!(
                    "Source {} ({}):\n{}",
                    result.relevance_rank, result.chunk.source_label, result.chunk.content
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        let system_prompt = format!("{SYSTEM_PROMPT_PREFACE}\n\n{sources}");

        match self.llm.chat(&system_prompt, &ctx.query).await {
            Ok(content) => {
                let sources = retrieval_results
                    .iter()
                    .map(|result| SourceCitation {
                        source: result.chunk.source_label.clone(),
                        chunk_id: result.chunk.id.clone(),
                        relevance_score: result.similarity_score,
                    })
                    .collect();

                GeneratedResponse {
                    content,
                    sources,
                    confidence: derive_confidence(retrieval_results, ctx.max_results, assessment.max_severity()),
                    safety_notices: assessment.required_disclaimers.clone(),
                }
            }
            Err(err) => {
                tracing::error!(error = %err, query_id = %ctx.query_id, "llm generation failed, returning degraded response");
                GeneratedResponse {
                    content: "I'm sorry, I wasn't able to generate a response right now. Please try again shortly."
                        .to_string(),
                    sources: Vec::new(),
                    confidence: 0.0,
                    safety_notices: assessment.required_disclaimers.clone(),
                }
            }
        }
    }
}

/// `min(1.0, retrieved / max_chunks) * (1.0 - max_flag_severity)` when there
/// is at least one retrieval result, else `1.0` (S3's graceful-fallback
/// answer still carries full confidence rather than looking broken).
fn derive_confidence(retrieval_results: &[RetrievalResult], max_chunks: usize, max_flag_severity: f32) -> f32 {
    if retrieval_results.is_empty() {
        return 1.0;
    }
    let coverage = (retrieval_results.len() as f32 / max_chunks.max(1) as f32).min(1.0);
    coverage * (1.0 - max_flag_severity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::types::{Category, Chunk};
    use embedding_provider::EmbeddingProvider;
    use uuid::Uuid;
    use vector_index::{EmbeddedIndex, VectorIndex};

    fn sample_results(count: usize) -> Vec<RetrievalResult> {
        (0..count)
            .map(|i| RetrievalResult {
                chunk: Chunk::new("doc", i, "body", 5, Category::Yoga, "source"),
                similarity_score: 0.9,
                relevance_rank: i + 1,
            })
            .collect()
    }

    #[test]
    fn confidence_is_full_when_no_retrieval_results() {
        assert_eq!(derive_confidence(&[], 5, 0.0), 1.0);
    }

    #[test]
    fn confidence_scales_with_coverage_and_drops_with_severity() {
        let results = sample_results(2);
        let confidence = derive_confidence(&results, 5, 0.0);
        assert!((confidence - 0.4).abs() < 1e-6);

        let confidence_with_risk = derive_confidence(&results, 5, 0.5);
        assert!((confidence_with_risk - 0.2).abs() < 1e-6);
    }

    #[test]
    fn confidence_never_exceeds_one() {
        let results = sample_results(10);
        assert_eq!(derive_confidence(&results, 5, 0.0), 1.0);
    }

    #[tokio::test]
    async fn blocked_query_never_reaches_retrieval() {
        let database = Uuid::new_v4().to_string();
        let db = common::storage::db::SurrealDbClient::memory("orchestrator_tests", &database)
            .await
            .expect("in-memory db");
        let index = VectorIndex::Embedded(EmbeddedIndex::new(db, 3));
        index.initialize().await.expect("index init");

        let mut config = AppConfig::default();
        config.embedding_dimension = 3;
        config.nvidia_embedding_base_url = Some("http://127.0.0.1:0".into());
        let embedding_provider = EmbeddingProvider::remote(
            embedding_provider::RemoteProvider::new(&config).expect("remote provider"),
        );
        let retrieval = SemanticRetrievalDriver::new(embedding_provider, index);

        let orchestrator = Orchestrator::from_config(&config, retrieval);
        let response = orchestrator
            .handle_query(AskRequest {
                query: "I am having a heart attack, what pose should I do?".to_string(),
                max_chunks: 5,
                min_similarity: 0.5,
                session_id: None,
            })
            .await;

        assert!(!response.safety_assessment.allow_response);
        assert!(response.retrieval_results.is_empty());
        assert!(response.response.content.starts_with(REFUSAL_PREFACE));
    }
}
