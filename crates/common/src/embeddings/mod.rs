//! Query embedding abstraction
//!
//! Provides a unified interface for embedding providers:
//! - Hugging Face Inference (sentence-transformers models such as all-MiniLM-L6-v2)
//! - OpenAI-compatible embeddings (text-embedding-3-small)
//!
//! The catalog index was built with a specific model; queries must be
//! embedded with the same one.

use crate::config::{require, EmbeddingConfig};
use crate::errors::{AppError, ExternalService, Result};
use crate::http;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Trait for embedding generation
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Hugging Face feature-extraction client
pub struct HuggingFaceEmbedder {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct FeatureExtractionRequest<'a> {
    inputs: &'a str,
}

/// Sentence models return one vector; token-level models return one per token
#[derive(Deserialize)]
#[serde(untagged)]
enum FeatureExtraction {
    Sentence(Vec<f32>),
    Tokens(Vec<Vec<f32>>),
}

impl FeatureExtraction {
    /// Collapse token vectors by mean pooling
    fn into_vector(self) -> Result<Vec<f32>> {
        match self {
            FeatureExtraction::Sentence(v) => Ok(v),
            FeatureExtraction::Tokens(rows) => {
                let dimension = rows.first().map(Vec::len).ok_or_else(|| {
                    AppError::external(ExternalService::Embedding, "Empty response")
                })?;

                let mut pooled = vec![0.0f32; dimension];
                for row in &rows {
                    if row.len() != dimension {
                        return Err(AppError::external(
                            ExternalService::Embedding,
                            "Ragged token embeddings in response",
                        ));
                    }
                    for (acc, value) in pooled.iter_mut().zip(row) {
                        *acc += value;
                    }
                }

                let count = rows.len() as f32;
                pooled.iter_mut().for_each(|v| *v /= count);
                Ok(pooled)
            }
        }
    }
}

impl HuggingFaceEmbedder {
    /// Create a new Hugging Face embedder
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = require(config.model.as_deref(), "embedding.model")?.to_string();

        Ok(Self {
            client: http::client(config.timeout_secs)?,
            api_key: config.api_key.clone(),
            model,
            base_url: config
                .api_base
                .clone()
                .unwrap_or_else(|| "https://router.huggingface.co/hf-inference".to_string()),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}/pipeline/feature-extraction",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl Embedder for HuggingFaceEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut request = self
            .client
            .post(self.endpoint())
            .json(&FeatureExtractionRequest { inputs: text });

        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = http::send(ExternalService::Embedding, request).await?;
        let body: FeatureExtraction = http::json(ExternalService::Embedding, response).await?;
        body.into_vector()
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// OpenAI embedding client
pub struct OpenAIEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    data: Vec<OpenAIEmbedding>,
}

#[derive(Deserialize)]
struct OpenAIEmbedding {
    embedding: Vec<f32>,
}

impl OpenAIEmbedder {
    /// Create a new OpenAI embedder
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = require(config.api_key.as_deref(), "embedding.api_key")?.to_string();
        let model = require(config.model.as_deref(), "embedding.model")?.to_string();

        Ok(Self {
            client: http::client(config.timeout_secs)?,
            api_key,
            model,
            base_url: config
                .api_base
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
        })
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/embeddings", self.base_url.trim_end_matches('/'));

        let response = http::send(
            ExternalService::Embedding,
            self.client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&OpenAIRequest {
                    input: text,
                    model: &self.model,
                }),
        )
        .await?;

        let result: OpenAIResponse = http::json(ExternalService::Embedding, response).await?;

        result
            .data
            .into_iter()
            .next()
            .map(|e| e.embedding)
            .ok_or_else(|| AppError::external(ExternalService::Embedding, "Empty response"))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Mock embedder for testing
///
/// Produces a deterministic vector derived from the text bytes.
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];
        if self.dimension == 0 {
            return Ok(vector);
        }
        for (i, byte) in text.bytes().enumerate() {
            vector[i % self.dimension] += byte as f32 / 255.0;
        }
        Ok(vector)
    }

    fn model_name(&self) -> &str {
        "mock-embedding"
    }
}

/// Create an embedder based on configuration
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "huggingface" => Ok(Arc::new(HuggingFaceEmbedder::new(config)?)),
        "openai" => Ok(Arc::new(OpenAIEmbedder::new(config)?)),
        other => Err(AppError::configuration(format!(
            "unknown embedding.provider `{}` (expected huggingface or openai)",
            other
        ))),
    }
}
