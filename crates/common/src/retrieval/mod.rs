//! Context retrieval
//!
//! Two context sources feed the generator:
//! - Catalog retrieval (vector index + MMR re-ranking over course records)
//! - Web retrieval (web search API)
//!
//! Both implement [`ContextProvider`]. The set is closed: the flow holds
//! exactly one provider of each kind and picks between them by route.

mod catalog;
mod mmr;
mod pinecone;
mod web;

pub use catalog::CatalogRetriever;
pub use mmr::{cosine_similarity, maximal_marginal_relevance};
pub use pinecone::{PineconeIndex, ScoredRecord};
pub use web::WebRetriever;

use crate::errors::{AppError, ExternalService, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Where a context set came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContextSource {
    /// Course catalog vector index
    Catalog,
    /// Web search
    Web,
}

impl ContextSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextSource::Catalog => "catalog",
            ContextSource::Web => "web",
        }
    }
}

/// Common trait for context providers
#[async_trait]
pub trait ContextProvider: Send + Sync {
    /// Fetch snippets for the query, most relevant first
    ///
    /// No match is an empty vector, not an error.
    async fn fetch(&self, query: &str) -> Result<Vec<String>>;

    /// Get the source kind
    fn source(&self) -> ContextSource;
}

/// Mock provider for testing
///
/// Returns fixed snippets and counts invocations.
pub struct MockContextProvider {
    source: ContextSource,
    snippets: Vec<String>,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl MockContextProvider {
    pub fn new<I, S>(source: ContextSource, snippets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source,
            snippets: snippets.into_iter().map(Into::into).collect(),
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail every fetch with the given message
    pub fn failing(source: ContextSource, message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::new(source, Vec::<String>::new())
        }
    }

    /// Number of fetches so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContextProvider for MockContextProvider {
    async fn fetch(&self, _query: &str) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = &self.failure {
            let service = match self.source {
                ContextSource::Catalog => ExternalService::VectorIndex,
                ContextSource::Web => ExternalService::WebSearch,
            };
            return Err(AppError::external(service, message.clone()));
        }

        Ok(self.snippets.clone())
    }

    fn source(&self) -> ContextSource {
        self.source
    }
}
