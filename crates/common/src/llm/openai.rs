//! OpenAI-compatible chat completions client

use super::LanguageModel;
use crate::config::{require, LlmConfig};
use crate::errors::{AppError, ExternalService, Result};
use crate::http;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Chat completions client for OpenAI and compatible gateways
pub struct OpenAIChatClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
    base_url: String,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

impl OpenAIChatClient {
    /// Create a new chat client; fails if no API key is configured
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
}

#[async_trait]
impl LanguageModel for OpenAIChatClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };

        let response = http::send(
            ExternalService::LanguageModel,
            self.client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&request),
        )
        .await?;

        let chat_response: ChatResponse =
            http::json(ExternalService::LanguageModel, response).await?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| {
                AppError::external(ExternalService::LanguageModel, "Empty response from LLM")
            })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubServer;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_complete_against_endpoint() {
        let stub = StubServer::start(&[(
            "/v1/chat/completions",
            StatusCode::OK,
            json!({ "choices": [{ "index": 0, "message": { "role": "assistant", "content": "general" } }] }),
        )])
        .await;
        let client = OpenAIChatClient::new(&LlmConfig {
            provider: "openai".to_string(),
            api_key: Some("sk-test".to_string()),
            api_base: Some(format!("{}/v1", stub.url)),
            model: "gpt-4o-mini".to_string(),
            ..LlmConfig::default()
        })
        .unwrap();

        assert_eq!(client.complete("Classify").await.unwrap(), "general");

        let requests = stub.requests();
        assert_eq!(requests[0].header("authorization"), Some("Bearer sk-test"));
        assert_eq!(requests[0].body["model"], "gpt-4o-mini");
    }

    #[test]
    fn test_response_parsing() {
        let body: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"course"}}]}"#,
        )
        .unwrap();
        assert_eq!(body.choices[0].message.content.as_deref(), Some("course"));
    }

    #[test]
    fn test_request_uses_single_user_message() {
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![ChatMessage {
                role: "user",
                content: "Classify",
            }],
            temperature: 0.0,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["messages"].as_array().unwrap().len(), 1);
        assert_eq!(value["messages"][0]["role"], "user");
    }
}
