//! Shared plumbing for outbound service clients

use crate::errors::{AppError, ExternalService, Result};
use std::time::Duration;

/// Build a pooled HTTP client with a per-request timeout
pub(crate) fn client(timeout_secs: u64) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// Send a request, mapping transport failures and non-2xx replies to
/// the given service
pub(crate) async fn send(
    service: ExternalService,
    request: reqwest::RequestBuilder,
) -> Result<reqwest::Response> {
    let response = request
        .send()
        .await
        .map_err(|e| AppError::external(service, format!("Request failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::external(
            service,
            format!("API error {}: {}", status, body),
        ));
    }

    Ok(response)
}

/// Decode a JSON body, attributing parse failures to the service
pub(crate) async fn json<T: serde::de::DeserializeOwned>(
    service: ExternalService,
    response: reqwest::Response,
) -> Result<T> {
    response
        .json()
        .await
        .map_err(|e| AppError::external(service, format!("Failed to parse response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubServer;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_non_success_status_maps_to_service() {
        let stub = StubServer::start(&[(
            "/query",
            StatusCode::SERVICE_UNAVAILABLE,
            json!({ "message": "overloaded" }),
        )])
        .await;
        let client = client(5).unwrap();

        let err = send(
            ExternalService::VectorIndex,
            client.post(format!("{}/query", stub.url)),
        )
        .await
        .unwrap_err();

        match err {
            AppError::ExternalService { service, message } => {
                assert_eq!(service, ExternalService::VectorIndex);
                assert!(message.contains("503"));
                assert!(message.contains("overloaded"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_failure_maps_to_service() {
        let client = client(5).unwrap();

        let err = send(ExternalService::WebSearch, client.get("http://127.0.0.1:1/search"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::ExternalService { service: ExternalService::WebSearch, .. }
        ));
    }

    #[tokio::test]
    async fn test_malformed_body_maps_to_service() {
        let stub = StubServer::start(&[("/embed", StatusCode::OK, json!("not a vector"))]).await;
        let client = client(5).unwrap();

        let response = send(
            ExternalService::Embedding,
            client.post(format!("{}/embed", stub.url)),
        )
        .await
        .unwrap();
        let err = super::json::<Vec<f32>>(ExternalService::Embedding, response)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Failed to parse response"));
    }
}
