//! Configuration management for IntelliCourse services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - The plain variable names used by earlier deployments
//!   (GOOGLE_API_KEY, PINECONE_INDEX, ...) as lowest-priority fallbacks
//! - Default values

use crate::agent::RoutingPolicy;
use crate::errors::{AppError, Result};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Plain environment variables mapped onto configuration keys
const FALLBACK_ENV: &[(&str, &str)] = &[
    ("GOOGLE_API_KEY", "llm.api_key"),
    ("HUGGINGFACE_EMBEDDING_MODEL", "embedding.model"),
    ("HUGGINGFACE_API_KEY", "embedding.api_key"),
    ("PINECONE_API_KEY", "catalog.api_key"),
    ("PINECONE_INDEX", "catalog.index_name"),
    ("TAVILY_API_KEY", "web_search.api_key"),
];

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Language model used by the router and the generator
    pub llm: LlmConfig,

    /// Query embedding configuration
    pub embedding: EmbeddingConfig,

    /// Course catalog vector index
    pub catalog: CatalogConfig,

    /// Web search configuration
    pub web_search: WebSearchConfig,

    /// Routing configuration
    pub routing: RoutingConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum concurrent requests
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// Provider: gemini, openai
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// API key for the provider
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default)]
    pub temperature: f32,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Embedding provider: huggingface, openai
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// API key for embedding service
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use; must match the model the index was built with
    pub model: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_service_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// Vector index API key
    pub api_key: Option<String>,

    /// Index name
    pub index_name: Option<String>,

    /// Data-plane host; resolved from the control plane when absent
    pub host: Option<String>,

    /// Control-plane base URL
    #[serde(default = "default_control_plane_url")]
    pub control_plane_url: String,

    /// Namespace holding the catalog records
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Snippets returned per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Candidates fetched before MMR re-ranking
    #[serde(default = "default_fetch_k")]
    pub fetch_k: usize,

    /// MMR relevance/diversity trade-off (1.0 = pure relevance)
    #[serde(default = "default_lambda_mult")]
    pub lambda_mult: f32,

    /// Metadata field holding the record text
    #[serde(default = "default_text_key")]
    pub text_key: String,

    /// Request timeout in seconds
    #[serde(default = "default_service_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebSearchConfig {
    /// Search API key
    pub api_key: Option<String>,

    /// API base URL
    #[serde(default = "default_web_search_base")]
    pub api_base: String,

    /// Results returned per query
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Request timeout in seconds
    #[serde(default = "default_service_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RoutingConfig {
    /// How router replies are turned into a decision
    #[serde(default)]
    pub policy: RoutingPolicy,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per second (global)
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8000 }
fn default_request_timeout() -> u64 { 120 }
fn default_max_concurrent() -> usize { 64 }
fn default_llm_provider() -> String { "gemini".to_string() }
fn default_llm_model() -> String { crate::DEFAULT_LLM_MODEL.to_string() }
fn default_llm_timeout() -> u64 { 60 }
fn default_embedding_provider() -> String { "huggingface".to_string() }
fn default_service_timeout() -> u64 { 30 }
fn default_control_plane_url() -> String { "https://api.pinecone.io".to_string() }
fn default_namespace() -> String { "default".to_string() }
fn default_top_k() -> usize { 20 }
fn default_fetch_k() -> usize { 20 }
fn default_lambda_mult() -> f32 { 0.5 }
fn default_text_key() -> String { "text".to_string() }
fn default_web_search_base() -> String { "https://api.tavily.com".to_string() }
fn default_max_results() -> usize { 3 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "intellicourse".to_string() }
fn default_rate_limit() -> u32 { 20 }
fn default_burst() -> u32 { 40 }
fn default_enabled() -> bool { true }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> std::result::Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let mut builder = Config::builder();

        // Plain variables sit below every file and APP__ source
        for (var, key) in FALLBACK_ENV {
            if let Ok(value) = std::env::var(var) {
                builder = builder.set_default(*key, value)?;
            }
        }

        let config = builder
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__CATALOG__TOP_K=10
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> std::result::Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

/// Return a required setting or a descriptive configuration error
pub fn require<'a>(value: Option<&'a str>, key: &str) -> Result<&'a str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::configuration(format!("required setting `{}` is not set", key)))
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            max_concurrent_requests: default_max_concurrent(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            api_key: None,
            api_base: None,
            model: default_llm_model(),
            temperature: 0.0,
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_key: None,
            api_base: None,
            model: None,
            timeout_secs: default_service_timeout(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            index_name: None,
            host: None,
            control_plane_url: default_control_plane_url(),
            namespace: default_namespace(),
            top_k: default_top_k(),
            fetch_k: default_fetch_k(),
            lambda_mult: default_lambda_mult(),
            text_key: default_text_key(),
            timeout_secs: default_service_timeout(),
        }
    }
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_web_search_base(),
            max_results: default_max_results(),
            timeout_secs: default_service_timeout(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rate_limit(),
            burst: default_burst(),
            enabled: default_enabled(),
        }
    }
}
