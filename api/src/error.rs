use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::error::AppError;
use serde::Serialize;
use thiserror::Error;

/// HTTP-facing error shape. 500-class variants never carry the original
/// `AppError` text into the response body; the full error is logged
/// server-side and the body carries a constant string instead.
#[derive(Error, Debug, Serialize, Clone)]
pub enum ApiError {
    #[error("Internal server error")]
    InternalError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Too many requests. Please try again later.")]
    RateLimited,
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Validation(msg) => Self::ValidationError(msg),
            AppError::RateLimit(_) => Self::RateLimited,
            _ => {
                tracing::error!(error = %err, "internal error reached the http boundary");
                Self::InternalError("Internal server error".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            Self::InternalError(message) => (StatusCode::INTERNAL_SERVER_ERROR, message.clone()),
            Self::ValidationError(message) => (StatusCode::BAD_REQUEST, message.clone()),
            Self::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests. Please try again later.".to_string(),
            ),
        };

        (status, Json(ErrorResponse { detail })).into_response()
    }
}

#[derive(Serialize, Debug)]
struct ErrorResponse {
    detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_status_code(response: ApiError, expected: StatusCode) {
        assert_eq!(response.into_response().status(), expected);
    }

    #[test]
    fn validation_error_maps_from_app_error() {
        let app_error = AppError::Validation("query must not be empty".to_string());
        let api_error = ApiError::from(app_error);
        assert!(matches!(api_error, ApiError::ValidationError(msg) if msg == "query must not be empty"));
    }

    #[test]
    fn rate_limit_error_maps_from_app_error() {
        let api_error = ApiError::from(AppError::RateLimit("over limit".to_string()));
        assert!(matches!(api_error, ApiError::RateLimited));
    }

    #[test]
    fn unrelated_app_errors_sanitize_to_internal_error() {
        let api_error = ApiError::from(AppError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full")));
        assert!(matches!(api_error, ApiError::InternalError(_)));
    }

    #[test]
    fn status_codes_match_the_http_surface() {
        assert_status_code(ApiError::InternalError("oops".into()), StatusCode::INTERNAL_SERVER_ERROR);
        assert_status_code(ApiError::ValidationError("bad query".into()), StatusCode::BAD_REQUEST);
        assert_status_code(ApiError::RateLimited, StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn internal_error_body_never_echoes_sensitive_detail() {
        let api_error = ApiError::InternalError("Internal server error".to_string());
        assert_eq!(api_error.to_string(), "Internal server error");
    }
}
