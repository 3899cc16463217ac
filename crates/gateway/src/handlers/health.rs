//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub version: String,
    pub components: Components,
}

/// Configured backends, as named in configuration
#[derive(Serialize)]
pub struct Components {
    pub language_model: String,
    pub embedding_model: String,
    pub vector_index: String,
    pub web_search: String,
}

/// Liveness check; healthy whenever the server is accepting requests
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

/// Readiness check
///
/// All clients are built and credentials checked before the listener
/// binds, so a serving gateway is ready by construction.
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let config = &state.config;

    Json(ReadyResponse {
        status: "ready".to_string(),
        version: intellicourse_common::VERSION.to_string(),
        components: Components {
            language_model: format!("{}/{}", config.llm.provider, config.llm.model),
            embedding_model: format!(
                "{}/{}",
                config.embedding.provider,
                config.embedding.model.as_deref().unwrap_or("unset")
            ),
            vector_index: config
                .catalog
                .index_name
                .clone()
                .unwrap_or_else(|| "unset".to_string()),
            web_search: "tavily".to_string(),
        },
    })
}
