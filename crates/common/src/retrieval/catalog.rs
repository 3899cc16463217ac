//! Course catalog retrieval
//!
//! Embeds the query, pulls `fetch_k` nearest catalog records from the
//! vector index and re-ranks them with MMR down to `top_k`, so that a
//! handful of near-identical course entries cannot crowd out the rest.

use super::mmr::maximal_marginal_relevance;
use super::pinecone::{PineconeIndex, ScoredRecord};
use super::{ContextProvider, ContextSource};
use crate::config::CatalogConfig;
use crate::embeddings::Embedder;
use crate::errors::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Vector-index retriever over the course catalog
pub struct CatalogRetriever {
    embedder: Arc<dyn Embedder>,
    index: PineconeIndex,
    top_k: usize,
    fetch_k: usize,
    lambda_mult: f32,
    text_key: String,
}

impl CatalogRetriever {
    /// Connect the retriever to its index
    pub async fn connect(config: &CatalogConfig, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let index = PineconeIndex::connect(config).await?;

        Ok(Self {
            embedder,
            index,
            top_k: config.top_k,
            fetch_k: config.fetch_k.max(config.top_k),
            lambda_mult: config.lambda_mult,
            text_key: config.text_key.clone(),
        })
    }
}

/// Re-rank index matches and keep the text of each pick
///
/// Matches without the text field are dropped before ranking.
fn select_snippets(
    query: &[f32],
    matches: Vec<ScoredRecord>,
    top_k: usize,
    lambda_mult: f32,
    text_key: &str,
) -> Vec<String> {
    let (texts, vectors): (Vec<String>, Vec<Vec<f32>>) = matches
        .into_iter()
        .filter_map(|record| {
            let text = record.text(text_key)?.to_string();
            Some((text, record.values))
        })
        .unzip();

    maximal_marginal_relevance(query, &vectors, top_k, lambda_mult)
        .into_iter()
        .map(|i| texts[i].clone())
        .collect()
}

#[async_trait]
impl ContextProvider for CatalogRetriever {
    #[instrument(skip(self, query), fields(index = %self.index.index_name(), top_k = self.top_k))]
    async fn fetch(&self, query: &str) -> Result<Vec<String>> {
        let embedding = self.embedder.embed(query).await?;
        let matches = self.index.query(&embedding, self.fetch_k).await?;
        debug!(candidates = matches.len(), "Catalog candidates fetched");

        Ok(select_snippets(
            &embedding,
            matches,
            self.top_k,
            self.lambda_mult,
            &self.text_key,
        ))
    }

    fn source(&self) -> ContextSource {
        ContextSource::Catalog
    }
}
