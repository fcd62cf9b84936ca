//! Image analyzer abstractions and implementations.
//!
//! The route handler only sees [`ImageAnalyzer`], so the Gemini backend can be
//! swapped for the mock in tests.

pub mod gemini;
pub mod mock;
pub mod prompt;

use crate::services::canvas::CanvasImage;
use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// Error type for analyzer operations.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Analyzer not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Content filtered")]
    ContentFiltered,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl AnalysisError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::NotConfigured(_) => "not_configured",
            AnalysisError::InvalidImage(_) => "invalid_image",
            AnalysisError::ApiError(_) => "api_error",
            AnalysisError::RateLimited => "rate_limited",
            AnalysisError::ContentFiltered => "content_filtered",
            AnalysisError::NetworkError(_) => "network_error",
            AnalysisError::MalformedResponse(_) => "malformed_response",
        }
    }
}

/// Solves the math drawn in an image.
#[async_trait]
pub trait ImageAnalyzer: Send + Sync {
    /// Analyze `image`, substituting known `variables`. Each result is an
    /// opaque JSON value (typically `{"expr", "result", "assign"}`), returned
    /// in the order the backend produced them.
    async fn analyze(
        &self,
        image: &CanvasImage,
        variables: &Map<String, Value>,
    ) -> Result<Vec<Value>, AnalysisError>;

    /// Health check.
    async fn health_check(&self) -> Result<(), AnalysisError>;
}
