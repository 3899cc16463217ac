//! Flow orchestrator
//!
//! ```text
//! Start ──route──▶ Routed ──fetch──▶ ContextFetched ──generate──▶ Answered
//!                    │ course → catalog provider
//!                    └ web    → web provider
//! ```
//!
//! Every run walks the full path once. A failing node aborts the run and
//! its error reaches the caller unchanged; there is no partial result.

use super::generator::AnswerGenerator;
use super::router::QueryRouter;
use super::state::{FlowOutcome, FlowState, RouteDecision};
use crate::config::AppConfig;
use crate::embeddings::create_embedder;
use crate::errors::Result;
use crate::llm::create_language_model;
use crate::metrics;
use crate::retrieval::{CatalogRetriever, ContextProvider, WebRetriever};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};
use uuid::Uuid;

/// Router → (catalog | web) → generator
pub struct AgentFlow {
    router: QueryRouter,
    catalog: Arc<dyn ContextProvider>,
    web: Arc<dyn ContextProvider>,
    generator: AnswerGenerator,
}

impl AgentFlow {
    pub fn new(
        router: QueryRouter,
        catalog: Arc<dyn ContextProvider>,
        web: Arc<dyn ContextProvider>,
        generator: AnswerGenerator,
    ) -> Self {
        Self {
            router,
            catalog,
            web,
            generator,
        }
    }

    /// Build every component from configuration
    ///
    /// Missing credentials or an unknown index fail here, at startup.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let model = create_language_model(&config.llm)?;
        let embedder = create_embedder(&config.embedding)?;

        let catalog = CatalogRetriever::connect(&config.catalog, embedder).await?;
        let web = WebRetriever::new(&config.web_search)?;

        info!(
            model = %model.model_name(),
            policy = ?config.routing.policy,
            "Agent flow initialized"
        );

        Ok(Self::new(
            QueryRouter::new(model.clone(), config.routing.policy),
            Arc::new(catalog),
            Arc::new(web),
            AnswerGenerator::new(model),
        ))
    }

    /// Run the flow for one query
    #[instrument(skip(self, query), fields(run_id = %Uuid::new_v4()))]
    pub async fn run(&self, query: &str) -> Result<FlowOutcome> {
        let start = Instant::now();
        let result = self.execute(FlowState::new(query)).await;
        let elapsed = start.elapsed().as_secs_f64();
        metrics::record_flow(elapsed, result.is_ok());

        let outcome = result?.into_outcome()?;
        info!(
            source_tool = %outcome.source_tool,
            snippets = outcome.retrieved_context.as_ref().map_or(0, Vec::len),
            latency_ms = (elapsed * 1000.0) as u64,
            "Flow completed"
        );
        Ok(outcome)
    }

    async fn execute(&self, state: FlowState) -> Result<FlowState> {
        let state = self.route_step(state).await?;
        let state = self.retrieve_step(state).await?;
        self.generate_step(state).await
    }

    /// `Start -> Routed`
    async fn route_step(&self, state: FlowState) -> Result<FlowState> {
        let route = self.router.route(state.query()).await?;
        state.with_route(route)
    }

    /// `Routed -> ContextFetched`
    async fn retrieve_step(&self, state: FlowState) -> Result<FlowState> {
        let provider = match state.route() {
            Some(RouteDecision::Course) => &self.catalog,
            _ => &self.web,
        };

        let start = Instant::now();
        let fetched = provider.fetch(state.query()).await;
        metrics::record_retrieval(
            start.elapsed().as_secs_f64(),
            provider.source().as_str(),
            fetched.as_ref().map_or(0, Vec::len),
            fetched.is_ok(),
        );

        state.with_context(fetched?)
    }

    /// `ContextFetched -> Answered`
    async fn generate_step(&self, state: FlowState) -> Result<FlowState> {
        let answer = self
            .generator
            .generate(state.query(), state.context())
            .await?;
        state.with_answer(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::RoutingPolicy;
    use crate::errors::AppError;
    use crate::llm::MockLanguageModel;
    use crate::retrieval::{ContextSource, MockContextProvider};

    struct Harness {
        model: Arc<MockLanguageModel>,
        catalog: Arc<MockContextProvider>,
        web: Arc<MockContextProvider>,
        flow: AgentFlow,
    }

    fn harness(
        replies: &[&str],
        catalog: MockContextProvider,
        web: MockContextProvider,
    ) -> Harness {
        let model = Arc::new(MockLanguageModel::with_replies(replies.iter().copied()));
        let catalog = Arc::new(catalog);
        let web = Arc::new(web);
        let flow = AgentFlow::new(
            QueryRouter::new(model.clone(), RoutingPolicy::Lenient),
            catalog.clone(),
            web.clone(),
            AnswerGenerator::new(model.clone()),
        );
        Harness {
            model,
            catalog,
            web,
            flow,
        }
    }

    fn empty(source: ContextSource) -> MockContextProvider {
        MockContextProvider::new(source, Vec::<String>::new())
    }

    #[tokio::test]
    async fn test_course_prerequisite_scenario() {
        let snippet = "Course Code: SE301 ... Prerequisite: CS201";
        let h = harness(
            &["course", "The prerequisite is CS201."],
            MockContextProvider::new(ContextSource::Catalog, [snippet]),
            empty(ContextSource::Web),
        );

        let outcome = h
            .flow
            .run("What are the prerequisites for Software Engineering?")
            .await
            .unwrap();

        assert_eq!(
            outcome,
            FlowOutcome {
                answer: "The prerequisite is CS201.".to_string(),
                source_tool: RouteDecision::Course,
                retrieved_context: Some(vec![snippet.to_string()]),
            }
        );
        assert!(h.model.prompts()[1].contains(snippet));
    }

    #[tokio::test]
    async fn test_general_query_scenario() {
        let h = harness(
            &["general", "Demand for data scientists keeps growing."],
            empty(ContextSource::Catalog),
            MockContextProvider::new(ContextSource::Web, ["Data scientist demand is rising..."]),
        );

        let outcome = h
            .flow
            .run("What is the job market like for data scientists?")
            .await
            .unwrap();

        assert_eq!(outcome.source_tool, RouteDecision::Web);
        assert_eq!(
            outcome.retrieved_context,
            Some(vec!["Data scientist demand is rising...".to_string()])
        );
    }

    #[tokio::test]
    async fn test_empty_catalog_falls_back() {
        let h = harness(
            &["course", "I don't know"],
            empty(ContextSource::Catalog),
            empty(ContextSource::Web),
        );

        let outcome = h
            .flow
            .run("Who is the instructor for the course Abnormal Psychology?")
            .await
            .unwrap();

        assert_eq!(outcome.answer, "I don't know");
        assert_eq!(outcome.source_tool, RouteDecision::Course);
        assert_eq!(outcome.retrieved_context, Some(vec![]));
        assert!(h.model.prompts()[1].contains("No relevant context found."));
    }

    #[tokio::test]
    async fn test_exactly_one_provider_per_run() {
        for (reply, catalog_calls, web_calls) in [
            ("course", 1, 0),
            ("  Course. ", 1, 0),
            ("general", 0, 1),
            ("", 0, 1),
            ("something else", 0, 1),
        ] {
            let h = harness(
                &[reply, "answer"],
                empty(ContextSource::Catalog),
                empty(ContextSource::Web),
            );
            h.flow.run("q").await.unwrap();

            assert_eq!(h.catalog.calls(), catalog_calls, "reply {:?}", reply);
            assert_eq!(h.web.calls(), web_calls, "reply {:?}", reply);
        }
    }

    #[tokio::test]
    async fn test_provider_failure_aborts_before_generation() {
        let h = harness(
            &["course", "unused"],
            MockContextProvider::failing(ContextSource::Catalog, "index not found"),
            empty(ContextSource::Web),
        );

        let err = h.flow.run("q").await.unwrap_err();

        assert!(matches!(err, AppError::ExternalService { .. }));
        assert_eq!(h.web.calls(), 0);
        // Only the router prompt was sent
        assert_eq!(h.model.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_router_failure_skips_retrieval() {
        let model = Arc::new(MockLanguageModel::failing("quota exceeded"));
        let catalog = Arc::new(empty(ContextSource::Catalog));
        let web = Arc::new(empty(ContextSource::Web));
        let flow = AgentFlow::new(
            QueryRouter::new(model.clone(), RoutingPolicy::Lenient),
            catalog.clone(),
            web.clone(),
            AnswerGenerator::new(model),
        );

        assert!(flow.run("q").await.is_err());
        assert_eq!(catalog.calls() + web.calls(), 0);
    }

    #[tokio::test]
    async fn test_strict_policy_rejects_ambiguous_reply() {
        let model = Arc::new(MockLanguageModel::with_replies(["maybe?", "unused"]));
        let catalog = Arc::new(empty(ContextSource::Catalog));
        let web = Arc::new(empty(ContextSource::Web));
        let flow = AgentFlow::new(
            QueryRouter::new(model.clone(), RoutingPolicy::Strict),
            catalog.clone(),
            web.clone(),
            AnswerGenerator::new(model),
        );

        let err = flow.run("q").await.unwrap_err();
        assert!(matches!(err, AppError::AmbiguousRoute { .. }));
        assert_eq!(catalog.calls() + web.calls(), 0);
    }
}
