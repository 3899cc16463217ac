//! Language model abstraction
//!
//! Provides a single-prompt completion interface over:
//! - Google Gemini (`generateContent`)
//! - OpenAI-compatible chat completions
//!
//! The router and the generator both talk to the model through
//! [`LanguageModel`]; neither depends on a concrete provider.

mod gemini;
mod openai;

pub use gemini::GeminiClient;
pub use openai::OpenAIChatClient;

use crate::config::LlmConfig;
use crate::errors::{AppError, ExternalService, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Trait for single-turn text completion
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete a prompt and return the raw reply text
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Create a language model client based on configuration
pub fn create_language_model(config: &LlmConfig) -> Result<Arc<dyn LanguageModel>> {
    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiClient::new(config)?)),
        "openai" => Ok(Arc::new(OpenAIChatClient::new(config)?)),
        other => Err(AppError::configuration(format!(
            "unknown llm.provider `{}` (expected gemini or openai)",
            other
        ))),
    }
}

/// Mock language model for testing
///
/// Replies are served in order; every prompt is recorded.
pub struct MockLanguageModel {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
    failure: Option<String>,
}

impl MockLanguageModel {
    /// Serve the given replies, one per call
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
            failure: None,
        }
    }

    /// Fail every call with the given message
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            failure: Some(message.into()),
        }
    }

    /// Prompts received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());

        if let Some(message) = &self.failure {
            return Err(AppError::external(ExternalService::LanguageModel, message.clone()));
        }

        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .ok_or_else(|| {
                AppError::external(ExternalService::LanguageModel, "no scripted reply left")
            })
    }

    fn model_name(&self) -> &str {
        "mock-llm"
    }
}
