//! Pinecone vector index client
//!
//! Resolves the index data-plane host through the control plane (unless
//! configured) and runs similarity queries that return stored vectors and
//! metadata, so candidates can be re-ranked client-side.

use crate::config::{require, CatalogConfig};
use crate::errors::{ExternalService, Result};
use crate::http;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

const API_VERSION: &str = "2024-07";

/// A match returned by the index
#[derive(Debug, Clone, Deserialize)]
pub struct ScoredRecord {
    pub id: String,

    #[serde(default)]
    pub score: f32,

    #[serde(default)]
    pub values: Vec<f32>,

    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

impl ScoredRecord {
    /// String metadata field, if present
    pub fn text(&self, key: &str) -> Option<&str> {
        self.metadata.as_ref()?.get(key)?.as_str()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    namespace: &'a str,
    include_values: bool,
    include_metadata: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<ScoredRecord>,
}

#[derive(Deserialize)]
struct IndexDescription {
    host: String,
}

/// Handle on one index namespace
pub struct PineconeIndex {
    client: reqwest::Client,
    api_key: String,
    index_name: String,
    host: String,
    namespace: String,
}

impl PineconeIndex {
    /// Connect to the configured index
    ///
    /// Fails fast when the API key or index name is missing, or when the
    /// control plane does not know the index.
    pub async fn connect(config: &CatalogConfig) -> Result<Self> {
        let api_key = require(config.api_key.as_deref(), "catalog.api_key")?.to_string();
        let index_name = require(config.index_name.as_deref(), "catalog.index_name")?.to_string();
        let client = http::client(config.timeout_secs)?;

        let host = match config.host.as_deref().map(str::trim).filter(|h| !h.is_empty()) {
            Some(host) => host.to_string(),
            None => {
                let url = format!(
                    "{}/indexes/{}",
                    config.control_plane_url.trim_end_matches('/'),
                    index_name
                );
                let response = http::send(
                    ExternalService::VectorIndex,
                    client
                        .get(&url)
                        .header("Api-Key", &api_key)
                        .header("X-Pinecone-API-Version", API_VERSION),
                )
                .await?;
                let description: IndexDescription =
                    http::json(ExternalService::VectorIndex, response).await?;
                description.host
            }
        };

        let host = normalize_host(&host);
        info!(index = %index_name, host = %host, "Resolved vector index host");

        Ok(Self {
            client,
            api_key,
            index_name,
            host,
            namespace: config.namespace.clone(),
        })
    }

    /// Query the `top_k` nearest records, with values and metadata
    pub async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredRecord>> {
        let request = QueryRequest {
            vector,
            top_k,
            namespace: &self.namespace,
            include_values: true,
            include_metadata: true,
        };

        let response = http::send(
            ExternalService::VectorIndex,
            self.client
                .post(format!("{}/query", self.host))
                .header("Api-Key", &self.api_key)
                .header("X-Pinecone-API-Version", API_VERSION)
                .json(&request),
        )
        .await?;

        let body: QueryResponse = http::json(ExternalService::VectorIndex, response).await?;
        Ok(body.matches)
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }
}

/// Control-plane hosts come without a scheme
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_host() {
        assert_eq!(
            normalize_host("catalog-abc123.svc.aped-4627-b74a.pinecone.io"),
            "https://catalog-abc123.svc.aped-4627-b74a.pinecone.io"
        );
        assert_eq!(normalize_host("http://localhost:5081/"), "http://localhost:5081");
    }

    #[test]
    fn test_query_request_shape() {
        let request = QueryRequest {
            vector: &[0.1, 0.2],
            top_k: 20,
            namespace: "default",
            include_values: true,
            include_metadata: true,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["topK"], 20);
        assert_eq!(value["includeValues"], true);
        assert_eq!(value["includeMetadata"], true);
        assert_eq!(value["namespace"], "default");
    }

    #[test]
    fn test_query_response_parsing() {
        let body: QueryResponse = serde_json::from_str(
            r#"{"matches":[{"id":"se301","score":0.82,"values":[0.1,0.2],"metadata":{"text":"Course Code: SE301","source":"catalog.docx"}}],"namespace":"default"}"#,
        )
        .unwrap();
        assert_eq!(body.matches.len(), 1);
        assert_eq!(body.matches[0].text("text"), Some("Course Code: SE301"));
        assert_eq!(body.matches[0].text("missing"), None);
    }

    #[test]
    fn test_empty_response_has_no_matches() {
        let body: QueryResponse = serde_json::from_str(r#"{"namespace":"default"}"#).unwrap();
        assert!(body.matches.is_empty());
    }

    #[tokio::test]
    async fn test_connect_requires_credentials() {
        let err = PineconeIndex::connect(&CatalogConfig::default()).await.err().unwrap();
        assert!(err.to_string().contains("catalog.api_key"));

        let config = CatalogConfig {
            api_key: Some("key".to_string()),
            ..CatalogConfig::default()
        };
        let err = PineconeIndex::connect(&config).await.err().unwrap();
        assert!(err.to_string().contains("catalog.index_name"));
    }
}
