//! The calculation pipeline: decode the canvas, then hand it to the analyzer.

use super::analyzers::{AnalysisError, ImageAnalyzer};
use super::canvas::{CanvasError, CanvasImage};
use crate::models::ImageData;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Everything that can go wrong between a valid request body and its answers.
#[derive(Error, Debug)]
pub enum CalculationError {
    #[error(transparent)]
    Canvas(#[from] CanvasError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl CalculationError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            CalculationError::Canvas(CanvasError::MissingSeparator) => "missing_separator",
            CalculationError::Canvas(CanvasError::InvalidBase64(_)) => "invalid_base64",
            CalculationError::Canvas(CanvasError::EmptyImage) => "empty_image",
            CalculationError::Analysis(err) => err.kind(),
        }
    }
}

#[derive(Clone)]
pub struct Calculator {
    analyzer: Arc<dyn ImageAnalyzer>,
}

impl Calculator {
    pub fn new(analyzer: Arc<dyn ImageAnalyzer>) -> Self {
        Self { analyzer }
    }

    pub fn analyzer(&self) -> &Arc<dyn ImageAnalyzer> {
        &self.analyzer
    }

    /// Decode `request.image` and analyze it with `request.dict_of_vars`.
    /// Results come back unchanged, in analyzer order.
    pub async fn calculate(&self, request: &ImageData) -> Result<Vec<Value>, CalculationError> {
        let image = CanvasImage::from_data_uri(&request.image)?;

        tracing::debug!(
            image_bytes = image.len(),
            mime_type = %image.mime_type(),
            "Decoded canvas image"
        );

        let answers = self.analyzer.analyze(&image, &request.dict_of_vars).await?;
        Ok(answers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::analyzers::mock::MockImageAnalyzer;
    use serde_json::{json, Map};

    fn request(image: &str, vars: Value) -> ImageData {
        ImageData {
            image: image.to_string(),
            dict_of_vars: vars.as_object().cloned().unwrap_or_default(),
        }
    }

    #[tokio::test]
    async fn returns_answers_in_analyzer_order() {
        let answers = vec![
            json!({"expr": "x", "result": 2}),
            json!({"expr": "y", "result": 5}),
            json!({"expr": "z", "result": -1}),
        ];
        let mock = Arc::new(MockImageAnalyzer::answering(answers.clone()));
        let calculator = Calculator::new(mock.clone());

        let result = calculator
            .calculate(&request("data:image/png;base64,aGVsbG8=", json!({})))
            .await
            .unwrap();

        assert_eq!(result, answers);
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn forwards_decoded_image_and_variables() {
        let mock = Arc::new(MockImageAnalyzer::answering(vec![]));
        let calculator = Calculator::new(mock.clone());

        calculator
            .calculate(&request(
                "data:image/jpeg;base64,aGVsbG8=",
                json!({"x": 4, "y": "z"}),
            ))
            .await
            .unwrap();

        let seen = mock.seen().await;
        assert_eq!(seen.len(), 1);
        let (image, vars) = &seen[0];
        assert_eq!(image.bytes(), b"hello");
        assert_eq!(image.mime_type(), "image/jpeg");
        let expected: Map<String, Value> = json!({"x": 4, "y": "z"}).as_object().cloned().unwrap();
        assert_eq!(vars, &expected);
    }

    #[tokio::test]
    async fn decode_failure_skips_analyzer() {
        let mock = Arc::new(MockImageAnalyzer::answering(vec![json!(1)]));
        let calculator = Calculator::new(mock.clone());

        let err = calculator
            .calculate(&request("not-a-data-uri", json!({})))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "missing_separator");
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn analyzer_failure_is_reported() {
        let mock = Arc::new(MockImageAnalyzer::failing(|| AnalysisError::RateLimited));
        let calculator = Calculator::new(mock);

        let err = calculator
            .calculate(&request("data:image/png;base64,aGVsbG8=", json!({})))
            .await
            .unwrap_err();

        assert!(matches!(err, CalculationError::Analysis(AnalysisError::RateLimited)));
        assert_eq!(err.to_string(), "Rate limited");
        assert_eq!(err.kind(), "rate_limited");
    }
}
