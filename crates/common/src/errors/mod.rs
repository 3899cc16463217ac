//! Error types for IntelliCourse services
//!
//! Provides:
//! - Distinct error types for configuration, upstream and request failures
//! - HTTP status code mapping
//! - The generic `{ "error": message }` response body
//! - Error codes for logs and metrics

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,

    // Routing errors (2xxx)
    AmbiguousRoute,

    // Rate limiting (6xxx)
    RateLimited,

    // External service errors (8xxx)
    UpstreamError,
    LanguageModelError,
    EmbeddingError,
    VectorIndexError,
    WebSearchError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,

            ErrorCode::AmbiguousRoute => 2001,

            ErrorCode::RateLimited => 6001,

            // External (8xxx)
            ErrorCode::UpstreamError => 8001,
            ErrorCode::LanguageModelError => 8002,
            ErrorCode::EmbeddingError => 8003,
            ErrorCode::VectorIndexError => 8004,
            ErrorCode::WebSearchError => 8005,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
        }
    }
}

/// External collaborators the flow depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalService {
    LanguageModel,
    Embedding,
    VectorIndex,
    WebSearch,
}

impl ExternalService {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExternalService::LanguageModel => "language_model",
            ExternalService::Embedding => "embedding",
            ExternalService::VectorIndex => "vector_index",
            ExternalService::WebSearch => "web_search",
        }
    }
}

impl fmt::Display for ExternalService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    // Only raised under the strict routing policy
    #[error("Router reply could not be classified: {reply:?}")]
    AmbiguousRoute { reply: String },

    // Rate limiting
    #[error("Rate limit exceeded: {limit} requests per second")]
    RateLimited { limit: u32 },

    // External service errors
    #[error("{service} service error: {message}")]
    ExternalService {
        service: ExternalService,
        message: String,
    },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl AppError {
    /// Shorthand for an upstream failure
    pub fn external(service: ExternalService, message: impl Into<String>) -> Self {
        AppError::ExternalService {
            service,
            message: message.into(),
        }
    }

    /// Shorthand for a missing or invalid setting
    pub fn configuration(message: impl Into<String>) -> Self {
        AppError::Configuration {
            message: message.into(),
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::AmbiguousRoute { .. } => ErrorCode::AmbiguousRoute,
            AppError::RateLimited { .. } => ErrorCode::RateLimited,
            AppError::ExternalService { service, .. } => match service {
                ExternalService::LanguageModel => ErrorCode::LanguageModelError,
                ExternalService::Embedding => ErrorCode::EmbeddingError,
                ExternalService::VectorIndex => ErrorCode::VectorIndexError,
                ExternalService::WebSearch => ErrorCode::WebSearchError,
            },
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
        }
    }

    /// Get the HTTP status code for this error
    ///
    /// Every failure inside the flow surfaces as a generic 500; only
    /// request-level rejections get a client status.
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,

            // 429 Too Many Requests
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,

            // 500 Internal Server Error
            AppError::AmbiguousRoute { .. }
            | AppError::ExternalService { .. }
            | AppError::HttpClient(_)
            | AppError::Internal { .. }
            | AppError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Error body returned to API callers
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::external(ExternalService::VectorIndex, "index not found");
        assert_eq!(err.code(), ErrorCode::VectorIndexError);
        assert_eq!(err.code().as_code(), 8004);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "vector_index service error: index not found");
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::Validation {
            message: "query too long".into(),
            field: Some("query".into()),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());
    }

    #[test]
    fn test_rate_limited() {
        let err = AppError::RateLimited { limit: 5 };
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.code(), ErrorCode::RateLimited);
    }

    #[test]
    fn test_http_client_error_is_upstream() {
        let source = reqwest::Client::new()
            .get("not a url")
            .build()
            .unwrap_err();
        let err: AppError = source.into();
        assert_eq!(err.code(), ErrorCode::UpstreamError);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_configuration_error_is_server_error() {
        let err = AppError::configuration("catalog.index_name is not set");
        assert!(err.is_server_error());
        assert_eq!(err.code(), ErrorCode::ConfigurationError);
    }

    #[tokio::test]
    async fn test_response_body_carries_message() {
        let err = AppError::external(ExternalService::LanguageModel, "quota exceeded");
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error, "language_model service error: quota exceeded");
    }
}
