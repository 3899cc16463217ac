//! Web retrieval through the Tavily search API

use super::{ContextProvider, ContextSource};
use crate::config::{require, WebSearchConfig};
use crate::errors::{ExternalService, Result};
use crate::http;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Web search retriever
pub struct WebRetriever {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    max_results: usize,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Deserialize)]
struct SearchResult {
    #[serde(default)]
    content: String,
}

impl WebRetriever {
    /// Create a new web retriever; fails if no API key is configured
    pub fn new(config: &WebSearchConfig) -> Result<Self> {
        let api_key = require(config.api_key.as_deref(), "web_search.api_key")?.to_string();

        Ok(Self {
            client: http::client(config.timeout_secs)?,
            api_key,
            base_url: config.api_base.trim_end_matches('/').to_string(),
            max_results: config.max_results,
        })
    }
}

#[async_trait]
impl ContextProvider for WebRetriever {
    #[instrument(skip(self, query), fields(max_results = self.max_results))]
    async fn fetch(&self, query: &str) -> Result<Vec<String>> {
        let response = http::send(
            ExternalService::WebSearch,
            self.client
                .post(format!("{}/search", self.base_url))
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&SearchRequest {
                    query,
                    max_results: self.max_results,
                }),
        )
        .await?;

        let body: SearchResponse = http::json(ExternalService::WebSearch, response).await?;

        Ok(body
            .results
            .into_iter()
            .take(self.max_results)
            .map(|r| r.content)
            .collect())
    }

    fn source(&self) -> ContextSource {
        ContextSource::Web
    }
}
