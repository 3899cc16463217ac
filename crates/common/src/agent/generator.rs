//! Answer generator - synthesizes the final answer from retrieved context
//!
//! The answering rules live in the prompt. The model is expected to
//! follow them, including the exact "I don't know" fallback, but its
//! reply is returned verbatim and never checked against them.

use crate::errors::Result;
use crate::llm::LanguageModel;
use crate::metrics;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Context text used when retrieval found nothing
pub const NO_CONTEXT_PLACEHOLDER: &str = "No relevant context found.";

/// Reply the model is told to give when nothing relevant is found
pub const FALLBACK_ANSWER: &str = "I don't know";

/// Join snippets for the prompt, or the placeholder when there are none
pub fn render_context(context: &[String]) -> String {
    if context.is_empty() {
        NO_CONTEXT_PLACEHOLDER.to_string()
    } else {
        context.join("\n\n")
    }
}

/// Build the answer prompt
pub fn build_prompt(query: &str, context_text: &str) -> String {
    format!(
        r#"
You are a helpful university assistant. Use the given context to answer student queries.

Student query: {query}

Context:
{context_text}

Guidelines:
- If the query is about **university courses**, use only the course catalog context:
  • Mention prerequisites clearly and only when it was asked about in the query.
  • If one prerequisite → say "The prerequisite is ...".
  • Always include course code with its respective course title when possible.
  • If only the course code is found, look in the context for its title.
  • If nothing relevant, reply exactly: "{fallback}".
- If the query is **general knowledge**, use the web search context:
  • Summarize key points in clear, student-friendly language.
  • Do not copy text verbatim.
  • If nothing relevant, reply exactly: "{fallback}".

General rules:
- Be concise and accurate.
- Do not invent info beyond the given context.
"#,
        query = query,
        context_text = context_text,
        fallback = FALLBACK_ANSWER,
    )
}

/// Language-model backed answer synthesizer
pub struct AnswerGenerator {
    model: Arc<dyn LanguageModel>,
}

impl AnswerGenerator {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Generate an answer for the query from the given context
    #[instrument(skip(self, query, context), fields(snippets = context.len()))]
    pub async fn generate(&self, query: &str, context: &[String]) -> Result<String> {
        let prompt = build_prompt(query, &render_context(context));

        let start = Instant::now();
        let answer = self.model.complete(&prompt).await;
        metrics::record_completion(
            start.elapsed().as_secs_f64(),
            "generator",
            self.model.model_name(),
            answer.is_ok(),
        );

        answer
    }
}
