//! IntelliCourse Common Library
//!
//! Shared code for the IntelliCourse services including:
//! - The agent flow (router, retrieval, answer generation)
//! - Language model and embedding client abstractions
//! - Course catalog and web search retrieval
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod agent;
pub mod config;
pub mod embeddings;
pub mod errors;
pub(crate) mod http;
pub mod llm;
pub mod metrics;
pub mod retrieval;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use agent::{AgentFlow, FlowOutcome, RouteDecision};
pub use config::AppConfig;
pub use embeddings::Embedder;
pub use errors::{AppError, Result};
pub use llm::LanguageModel;
pub use retrieval::ContextProvider;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default language model used by both the router and the generator
pub const DEFAULT_LLM_MODEL: &str = "gemini-2.5-flash";
