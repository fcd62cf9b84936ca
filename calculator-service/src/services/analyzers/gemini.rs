//! Gemini image analyzer.
//!
//! Sends the canvas snapshot and the solving instructions to Gemini's
//! `generateContent` endpoint and parses the JSON answer list it replies with.

use super::{prompt, AnalysisError, ImageAnalyzer};
use crate::services::canvas::CanvasImage;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use image::ImageFormat;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use service_core::observability::TracedClientExt;
use std::io::Cursor;

/// Header carrying the API key, which keeps it out of request URLs and logs.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Finish reasons for a candidate withheld by Gemini's content filters.
const FILTERED_FINISH_REASONS: &[&str] = &["SAFETY", "PROHIBITED_CONTENT", "BLOCKLIST", "SPII"];

/// Gemini analyzer configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<Secret<String>>,
    pub model: String,
    pub api_base: String,
}

/// Gemini image analyzer.
pub struct GeminiImageAnalyzer {
    config: GeminiConfig,
    client: Client,
}

impl GeminiImageAnalyzer {
    pub fn new(config: GeminiConfig) -> Result<Self, AnalysisError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| AnalysisError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn api_key(&self) -> Result<&str, AnalysisError> {
        self.config
            .api_key
            .as_ref()
            .map(|key| key.expose_secret().as_str())
            .ok_or_else(|| AnalysisError::NotConfigured("GEMINI_API_KEY is not set".to_string()))
    }

    /// Build the API URL for the given model and method.
    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.model,
            method
        )
    }
}

#[async_trait]
impl ImageAnalyzer for GeminiImageAnalyzer {
    async fn analyze(
        &self,
        image: &CanvasImage,
        variables: &Map<String, Value>,
    ) -> Result<Vec<Value>, AnalysisError> {
        let api_key = self.api_key()?;
        let png = encode_png(image).await?;

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    ContentPart::Text {
                        text: prompt::build_prompt(variables),
                    },
                    ContentPart::InlineData {
                        inline_data: InlineData {
                            mime_type: "image/png".to_string(),
                            data: png,
                        },
                    },
                ],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
            }),
        };

        tracing::debug!(
            model = %self.config.model,
            image_bytes = image.len(),
            variable_count = variables.len(),
            "Sending request to Gemini API"
        );

        let response = self
            .client
            .traced_post(&self.api_url("generateContent"))
            .header(API_KEY_HEADER, api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AnalysisError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                return Err(AnalysisError::RateLimited);
            }

            return Err(AnalysisError::ApiError(format!(
                "Gemini API error {}: {}",
                status, error_text
            )));
        }

        let api_response: GenerateContentResponse = response.json().await.map_err(|e| {
            AnalysisError::MalformedResponse(format!("Failed to parse response: {}", e))
        })?;

        let text = answer_text(&api_response)?;
        let answers = parse_answers(&text)?;

        tracing::debug!(
            model = %self.config.model,
            answer_count = answers.len(),
            "Gemini analysis complete"
        );

        Ok(answers)
    }

    async fn health_check(&self) -> Result<(), AnalysisError> {
        let api_key = self.api_key()?;

        // Listing models verifies both connectivity and the key.
        let url = format!("{}/models", self.config.api_base.trim_end_matches('/'));

        let response = self
            .client
            .traced_get(&url)
            .header(API_KEY_HEADER, api_key)
            .send()
            .await
            .map_err(|e| AnalysisError::NetworkError(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AnalysisError::ApiError(format!(
                "Health check failed: {}",
                response.status()
            )))
        }
    }
}

/// Decode the canvas bytes and re-encode them as base64 PNG, off the async
/// runtime.
async fn encode_png(image: &CanvasImage) -> Result<String, AnalysisError> {
    let bytes = image.bytes().to_vec();

    tokio::task::spawn_blocking(move || reencode_as_png(&bytes))
        .await
        .map_err(|e| AnalysisError::InvalidImage(format!("image conversion task failed: {}", e)))?
}

fn reencode_as_png(bytes: &[u8]) -> Result<String, AnalysisError> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| AnalysisError::InvalidImage(format!("cannot identify image: {}", e)))?;

    let mut png = Cursor::new(Vec::new());
    decoded
        .write_to(&mut png, ImageFormat::Png)
        .map_err(|e| AnalysisError::InvalidImage(format!("cannot re-encode image: {}", e)))?;

    Ok(general_purpose::STANDARD.encode(png.into_inner()))
}

/// Concatenated text of the first candidate.
fn answer_text(response: &GenerateContentResponse) -> Result<String, AnalysisError> {
    let Some(candidate) = response.candidates.first() else {
        let blocked = response
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_ref())
            .is_some();
        return Err(if blocked {
            AnalysisError::ContentFiltered
        } else {
            AnalysisError::MalformedResponse("response contained no candidates".to_string())
        });
    };

    if let Some(reason) = candidate.finish_reason.as_deref() {
        if FILTERED_FINISH_REASONS.contains(&reason) {
            return Err(AnalysisError::ContentFiltered);
        }
    }

    let text: String = candidate
        .content
        .iter()
        .flat_map(|content| content.parts.iter())
        .filter_map(|part| match part {
            ContentPart::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect();

    if text.trim().is_empty() {
        return Err(AnalysisError::MalformedResponse(
            "response contained no text".to_string(),
        ));
    }

    Ok(text)
}

/// Parse the model's reply into the answer list.
///
/// A bare object is treated as a one-element list. Every object answer gets
/// a boolean `assign`, true only when the model included the key.
pub fn parse_answers(text: &str) -> Result<Vec<Value>, AnalysisError> {
    let body = strip_code_fence(text);

    let parsed: Value = serde_json::from_str(body).map_err(|e| {
        AnalysisError::MalformedResponse(format!("answer is not valid JSON: {}", e))
    })?;

    let answers = match parsed {
        Value::Array(items) => items,
        object @ Value::Object(_) => vec![object],
        other => {
            return Err(AnalysisError::MalformedResponse(format!(
                "expected a JSON array of answers, got {}",
                other
            )))
        }
    };

    Ok(answers.into_iter().map(mark_assignment).collect())
}

fn mark_assignment(mut answer: Value) -> Value {
    if let Value::Object(fields) = &mut answer {
        let assigned = fields.contains_key("assign");
        fields.insert("assign".to_string(), Value::Bool(assigned));
    }
    answer
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);

    // Drop a language tag such as `json`, with or without a line break after it.
    inner.trim_start_matches(|c: char| c.is_ascii_alphabetic()).trim()
}

// ============================================================================
// Gemini API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum ContentPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}
