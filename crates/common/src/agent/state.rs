//! Flow state and terminal outcome
//!
//! A [`FlowState`] is owned by one run. Nodes never mutate it in place:
//! each transition consumes the current value and returns the next one.

use crate::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Router verdict; also reported to callers as the source tool
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RouteDecision {
    /// University course catalog
    Course,
    /// General web search
    Web,
}

impl RouteDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteDecision::Course => "course",
            RouteDecision::Web => "web",
        }
    }
}

impl fmt::Display for RouteDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a run in the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStage {
    Start,
    Routed,
    ContextFetched,
    Answered,
}

/// Per-run state threaded through the flow
#[derive(Debug, Clone, PartialEq)]
pub struct FlowState {
    query: String,
    route: Option<RouteDecision>,
    context: Vec<String>,
    answer: String,
    stage: FlowStage,
}

impl FlowState {
    /// Initial state: no route, empty context and answer
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            route: None,
            context: Vec::new(),
            answer: String::new(),
            stage: FlowStage::Start,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn route(&self) -> Option<RouteDecision> {
        self.route
    }

    pub fn context(&self) -> &[String] {
        &self.context
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn stage(&self) -> FlowStage {
        self.stage
    }

    /// `Start -> Routed`
    pub fn with_route(self, route: RouteDecision) -> Result<Self> {
        self.expect_stage(FlowStage::Start)?;
        Ok(Self {
            route: Some(route),
            stage: FlowStage::Routed,
            ..self
        })
    }

    /// `Routed -> ContextFetched`
    pub fn with_context(self, context: Vec<String>) -> Result<Self> {
        self.expect_stage(FlowStage::Routed)?;
        Ok(Self {
            context,
            stage: FlowStage::ContextFetched,
            ..self
        })
    }

    /// `ContextFetched -> Answered`
    pub fn with_answer(self, answer: String) -> Result<Self> {
        self.expect_stage(FlowStage::ContextFetched)?;
        Ok(Self {
            answer,
            stage: FlowStage::Answered,
            ..self
        })
    }

    /// Terminal step: turn an answered state into the caller-facing outcome
    pub fn into_outcome(self) -> Result<FlowOutcome> {
        self.expect_stage(FlowStage::Answered)?;
        let source_tool = self.route.ok_or_else(|| AppError::Internal {
            message: "answered flow has no route".to_string(),
        })?;

        Ok(FlowOutcome {
            answer: self.answer,
            source_tool,
            retrieved_context: Some(self.context),
        })
    }

    fn expect_stage(&self, expected: FlowStage) -> Result<()> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(AppError::Internal {
                message: format!(
                    "invalid flow transition: expected {:?}, found {:?}",
                    expected, self.stage
                ),
            })
        }
    }
}

/// Terminal result of a run, as returned by the chat API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlowOutcome {
    pub answer: String,
    pub source_tool: RouteDecision,
    pub retrieved_context: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = FlowState::new("What is CS201?");
        assert_eq!(state.stage(), FlowStage::Start);
        assert_eq!(state.route(), None);
        assert!(state.context().is_empty());
        assert_eq!(state.answer(), "");
    }

    #[test]
    fn test_full_walk_produces_outcome() {
        let outcome = FlowState::new("q")
            .with_route(RouteDecision::Course)
            .and_then(|s| s.with_context(vec!["snippet".to_string()]))
            .and_then(|s| s.with_answer("answer".to_string()))
            .and_then(FlowState::into_outcome)
            .unwrap();

        assert_eq!(outcome.answer, "answer");
        assert_eq!(outcome.source_tool, RouteDecision::Course);
        assert_eq!(outcome.retrieved_context, Some(vec!["snippet".to_string()]));
    }

    #[test]
    fn test_transitions_cannot_skip() {
        let err = FlowState::new("q").with_context(vec![]).unwrap_err();
        assert!(matches!(err, AppError::Internal { .. }));

        let routed = FlowState::new("q").with_route(RouteDecision::Web).unwrap();
        assert!(routed.clone().with_answer("a".to_string()).is_err());
        assert!(routed.with_route(RouteDecision::Course).is_err());
    }

    #[test]
    fn test_outcome_wire_format() {
        let outcome = FlowOutcome {
            answer: "The prerequisite is CS201.".to_string(),
            source_tool: RouteDecision::Course,
            retrieved_context: Some(vec!["Course Code: SE301".to_string()]),
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["source_tool"], "course");
        assert_eq!(value["retrieved_context"][0], "Course Code: SE301");
    }
}
