use thiserror::Error;
use tokio::task::JoinError;

/// The typed error taxonomy shared by every component. Every downstream
/// component past admission has a defined degraded-mode response; see each
/// call site for how a given variant is swallowed rather than propagated.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("chunking error: {0}")]
    Chunking(String),
    #[error("embedding error: {0}")]
    Embedding(String),
    #[error("retrieval error: {0}")]
    Retrieval(String),
    #[error("response generation error: {0}")]
    ResponseGeneration(String),
    #[error("safety filter error: {0}")]
    SafetyFilter(String),
    #[error("rate limit error: {0}")]
    RateLimit(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("database error: {0}")]
    Database(#[from] surrealdb::Error),
    #[error("http client error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("openai error: {0}")]
    OpenAI(#[from] async_openai::error::OpenAIError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),
    #[error("task join error: {0}")]
    Join(#[from] JoinError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// True for the kinds §7 marks as request-fatal (admission/validation);
    /// everything else has a degraded-mode response and must not reach here.
    pub fn is_request_fatal(&self) -> bool {
        matches!(
            self,
            AppError::RateLimit(_) | AppError::Validation(_) | AppError::Configuration(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_and_validation_are_request_fatal() {
        assert!(AppError::RateLimit("over limit".into()).is_request_fatal());
        assert!(AppError::Validation("bad input".into()).is_request_fatal());
    }

    #[test]
    fn retrieval_and_embedding_are_not_request_fatal() {
        assert!(!AppError::Retrieval("index down".into()).is_request_fatal());
        assert!(!AppError::Embedding("provider down".into()).is_request_fatal());
    }
}
