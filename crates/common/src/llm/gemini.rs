//! Google Gemini client (`models/{model}:generateContent`)

use super::LanguageModel;
use crate::config::{require, LlmConfig};
use crate::errors::{AppError, ExternalService, Result};
use crate::http;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini completion client
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
    base_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiClient {
    /// Create a new Gemini client; fails if no API key is configured
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = require(config.api_key.as_deref(), "llm.api_key")?.to_string();

        Ok(Self {
            client: http::client(config.timeout_secs)?,
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            base_url: config
                .api_base
                .clone()
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

/// Concatenate the text parts of the first candidate
fn reply_text(response: GenerateContentResponse) -> Result<String> {
    let candidate = response.candidates.into_iter().next().ok_or_else(|| {
        AppError::external(ExternalService::LanguageModel, "response contained no candidates")
    })?;

    if candidate.content.is_none() {
        tracing::warn!(
            finish_reason = candidate.finish_reason.as_deref().unwrap_or("unknown"),
            "Gemini candidate has no content"
        );
    }

    Ok(candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
        .unwrap_or_default())
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        let response = http::send(
            ExternalService::LanguageModel,
            self.client
                .post(self.endpoint())
                .header("x-goog-api-key", &self.api_key)
                .json(&request),
        )
        .await?;

        let body: GenerateContentResponse =
            http::json(ExternalService::LanguageModel, response).await?;
        reply_text(body)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
