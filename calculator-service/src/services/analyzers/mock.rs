//! Mock analyzer for testing.

use super::{AnalysisError, ImageAnalyzer};
use crate::services::canvas::CanvasImage;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

type ErrorFactory = Box<dyn Fn() -> AnalysisError + Send + Sync>;

enum Behaviour {
    Answer(Vec<Value>),
    Fail(ErrorFactory),
}

/// Returns canned answers (or a canned error) and records every call.
pub struct MockImageAnalyzer {
    behaviour: Behaviour,
    calls: AtomicUsize,
    seen: Mutex<Vec<(CanvasImage, Map<String, Value>)>>,
}

impl MockImageAnalyzer {
    pub fn answering(answers: Vec<Value>) -> Self {
        Self::with_behaviour(Behaviour::Answer(answers))
    }

    pub fn failing<F>(make_error: F) -> Self
    where
        F: Fn() -> AnalysisError + Send + Sync + 'static,
    {
        Self::with_behaviour(Behaviour::Fail(Box::new(make_error)))
    }

    fn with_behaviour(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Number of `analyze` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Images and variables passed to `analyze`, in call order.
    pub async fn seen(&self) -> Vec<(CanvasImage, Map<String, Value>)> {
        self.seen.lock().await.clone()
    }
}

#[async_trait]
impl ImageAnalyzer for MockImageAnalyzer {
    async fn analyze(
        &self,
        image: &CanvasImage,
        variables: &Map<String, Value>,
    ) -> Result<Vec<Value>, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .await
            .push((image.clone(), variables.clone()));

        match &self.behaviour {
            Behaviour::Answer(answers) => Ok(answers.clone()),
            Behaviour::Fail(make_error) => Err(make_error()),
        }
    }

    async fn health_check(&self) -> Result<(), AnalysisError> {
        match &self.behaviour {
            Behaviour::Answer(_) => Ok(()),
            Behaviour::Fail(make_error) => Err(make_error()),
        }
    }
}
