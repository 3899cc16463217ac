//! Agentic chat flow
//!
//! A query is classified by the [`QueryRouter`], context is fetched from
//! exactly one provider, and the [`AnswerGenerator`] writes the answer.
//! [`AgentFlow`] wires the three together.

mod flow;
mod generator;
mod router;
mod state;

pub use flow::AgentFlow;
pub use generator::{AnswerGenerator, FALLBACK_ANSWER, NO_CONTEXT_PLACEHOLDER};
pub use router::{QueryRouter, RoutingPolicy};
pub use state::{FlowOutcome, FlowStage, FlowState, RouteDecision};
