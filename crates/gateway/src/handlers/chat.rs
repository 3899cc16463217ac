//! Chat handler

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::AppState;
use intellicourse_common::{
    agent::FlowOutcome,
    errors::{AppError, Result},
    metrics::RequestMetrics,
};

/// Chat request
///
/// An empty query is accepted and runs the flow like any other.
#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(max = 4000))]
    pub query: String,
}

/// Answer a student query
///
/// POST /chat
pub async fn chat(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<FlowOutcome>> {
    let metrics = RequestMetrics::start("POST", "/chat");

    let result = answer(&state, payload).await;

    let status = match &result {
        Ok(_) => 200,
        Err(e) => e.status_code().as_u16(),
    };
    metrics.finish(status);

    result.map(Json)
}

async fn answer(
    state: &AppState,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<FlowOutcome> {
    let Json(request) = payload.map_err(|e| AppError::Validation {
        message: e.body_text(),
        field: None,
    })?;

    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some("query".to_string()),
    })?;

    tracing::info!(query_len = request.query.chars().count(), "Chat request");

    state.flow.run(&request.query).await
}
