//! Query router - decides between catalog and web retrieval
//!
//! The language model is asked for a single category word. Its reply is
//! turned into a [`RouteDecision`] by a [`RoutingPolicy`].

use super::state::RouteDecision;
use crate::errors::{AppError, Result};
use crate::llm::LanguageModel;
use crate::metrics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// Build the classification prompt for a query
pub fn build_prompt(query: &str) -> String {
    format!(
        "\nClassify the following user query:\n\n\
        Query: {}\n\n\
        Respond with only one word:\n\
        - 'course' if it is related to university courses, departments, prerequisites, or other university related information\n\
        - 'general' if it is a general knowledge question.\n",
        query
    )
}

/// How a router reply becomes a decision
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingPolicy {
    /// Any reply containing "course" routes to the catalog; everything
    /// else, including empty or malformed replies, routes to the web.
    ///
    /// A verbose reply that merely mentions "course" (e.g. "not a course
    /// question") is still classified as a course query.
    #[default]
    Lenient,

    /// Same substring match, but a reply naming neither category is
    /// rejected with [`AppError::AmbiguousRoute`].
    Strict,
}

impl RoutingPolicy {
    /// Decide a route from the raw model reply
    pub fn decide(&self, reply: &str) -> Result<RouteDecision> {
        let normalized = reply.trim().to_lowercase();

        if normalized.contains("course") {
            return Ok(RouteDecision::Course);
        }

        let recognized = normalized.contains("general") || normalized.contains("web");
        match self {
            RoutingPolicy::Lenient => {
                if !recognized {
                    warn!(reply = %reply, "Unrecognized router reply, defaulting to web");
                }
                Ok(RouteDecision::Web)
            }
            RoutingPolicy::Strict if recognized => Ok(RouteDecision::Web),
            RoutingPolicy::Strict => Err(AppError::AmbiguousRoute {
                reply: reply.to_string(),
            }),
        }
    }
}

/// Language-model backed query classifier
pub struct QueryRouter {
    model: Arc<dyn LanguageModel>,
    policy: RoutingPolicy,
}

impl QueryRouter {
    pub fn new(model: Arc<dyn LanguageModel>, policy: RoutingPolicy) -> Self {
        Self { model, policy }
    }

    /// Classify a query
    #[instrument(skip(self, query), fields(policy = ?self.policy))]
    pub async fn route(&self, query: &str) -> Result<RouteDecision> {
        let start = Instant::now();
        let reply = self.model.complete(&build_prompt(query)).await;
        metrics::record_completion(
            start.elapsed().as_secs_f64(),
            "router",
            self.model.model_name(),
            reply.is_ok(),
        );

        let reply = reply?;
        let decision = self.policy.decide(&reply)?;

        debug!(reply = %reply.trim(), route = %decision, "Query routed");
        metrics::record_route(decision.as_str());
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLanguageModel;

    #[test]
    fn test_prompt_embeds_query() {
        let prompt = build_prompt("Who teaches Abnormal Psychology?");
        assert!(prompt.contains("Query: Who teaches Abnormal Psychology?"));
        assert!(prompt.contains("Respond with only one word"));
    }

    #[test]
    fn test_lenient_substring_match() {
        let policy = RoutingPolicy::Lenient;
        assert_eq!(policy.decide("course").unwrap(), RouteDecision::Course);
        assert_eq!(policy.decide("  COURSE\n").unwrap(), RouteDecision::Course);
        assert_eq!(policy.decide("'course'").unwrap(), RouteDecision::Course);
        assert_eq!(policy.decide("general").unwrap(), RouteDecision::Web);
    }

    #[test]
    fn test_lenient_defaults_to_web() {
        let policy = RoutingPolicy::Lenient;
        assert_eq!(policy.decide("").unwrap(), RouteDecision::Web);
        assert_eq!(policy.decide("banana").unwrap(), RouteDecision::Web);
    }

    #[test]
    fn test_lenient_known_looseness() {
        // Mentioning the word is enough, whatever the verdict
        let decision = RoutingPolicy::Lenient
            .decide("This is not a course question; general.")
            .unwrap();
        assert_eq!(decision, RouteDecision::Course);
    }

    #[test]
    fn test_strict_rejects_unrecognized() {
        let policy = RoutingPolicy::Strict;
        assert_eq!(policy.decide("course").unwrap(), RouteDecision::Course);
        assert_eq!(policy.decide("General").unwrap(), RouteDecision::Web);
        assert!(matches!(
            policy.decide("").unwrap_err(),
            AppError::AmbiguousRoute { .. }
        ));
        assert!(policy.decide("banana").is_err());
    }

    #[tokio::test]
    async fn test_route_uses_model_reply() {
        let model = Arc::new(MockLanguageModel::with_replies(["course"]));
        let router = QueryRouter::new(model.clone(), RoutingPolicy::Lenient);

        let decision = router
            .route("What are the prerequisites for Software Engineering?")
            .await
            .unwrap();

        assert_eq!(decision, RouteDecision::Course);
        assert_eq!(model.prompts().len(), 1);
        assert!(model.prompts()[0].contains("Software Engineering"));
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let model = Arc::new(MockLanguageModel::failing("503 Service Unavailable"));
        let router = QueryRouter::new(model, RoutingPolicy::Lenient);

        let err = router.route("anything").await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }
}
