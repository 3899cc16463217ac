//! In-process HTTP stub for exercising the service clients
//!
//! Each stub answers a fixed set of paths with canned JSON and records
//! every request it receives. Unknown paths get a 404.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// A request as seen by the stub
#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Clone)]
struct StubState {
    routes: Arc<HashMap<String, (StatusCode, Value)>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

/// Running stub server
pub(crate) struct StubServer {
    pub url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl StubServer {
    /// Serve `routes` (exact path, status, body) on an ephemeral local port
    pub async fn start(routes: &[(&str, StatusCode, Value)]) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = StubState {
            routes: Arc::new(
                routes
                    .iter()
                    .map(|(path, status, body)| (path.to_string(), (*status, body.clone())))
                    .collect(),
            ),
            requests: requests.clone(),
        };

        let app = Router::new().fallback(reply).with_state(state);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { url, requests }
    }

    /// Requests received so far, in arrival order
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

async fn reply(
    State(state): State<StubState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let path = uri.path().to_string();
    state.requests.lock().unwrap().push(Recorded {
        method,
        path: path.clone(),
        headers,
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    match state.routes.get(&path) {
        Some((status, body)) => (*status, Json(body.clone())),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("no route for {}", path) })),
        ),
    }
}
