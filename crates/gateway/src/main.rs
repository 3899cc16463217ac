//! IntelliCourse API Gateway
//!
//! The entry point for student chat requests.
//! Handles:
//! - Request validation and routing to the agent flow
//! - Rate limiting, timeouts and concurrency limits
//! - Observability (logging, metrics)

mod handlers;
mod middleware;

use axum::{
    error_handling::HandleErrorLayer,
    middleware::from_fn_with_state,
    routing::{get, post},
    BoxError, Router,
};
use intellicourse_common::{
    agent::AgentFlow,
    config::{AppConfig, ObservabilityConfig},
    errors::{AppError, Result},
    metrics,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::{
    limit::ConcurrencyLimitLayer,
    timeout::{error::Elapsed, TimeoutLayer},
    ServiceBuilder,
};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub flow: Arc<AgentFlow>,
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    // Initialize tracing
    init_tracing(&config.observability);

    info!(
        service = %config.observability.service_name,
        "Starting IntelliCourse API Gateway v{}",
        intellicourse_common::VERSION
    );

    // Initialize metrics
    install_metrics_exporter(config.observability.metrics_port)?;
    metrics::register_metrics();

    // Build the agent flow; missing credentials fail here
    let flow = AgentFlow::from_config(&config).await.map_err(|e| {
        error!(error = %e, "Failed to initialize agent flow");
        e
    })?;

    let config = Arc::new(config);
    let state = AppState {
        config: config.clone(),
        flow: Arc::new(flow),
    };

    // Build the router
    let app = create_router(state)?;

    // Start the server
    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Install the tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logging {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

/// Serve Prometheus metrics on their own port (0 disables)
fn install_metrics_exporter(port: u16) -> std::result::Result<(), Box<dyn std::error::Error>> {
    if port == 0 {
        info!("Metrics exporter disabled");
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(SocketAddr::from(([0, 0, 0, 0], port)))
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            metrics::LATENCY_BUCKETS,
        )?
        .install()?;

    info!(port, "Metrics exporter listening");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Result<Router> {
    let config = state.config.clone();

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let mut routes = Router::new()
        .route("/chat", post(handlers::chat::chat))
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready));

    if config.rate_limit.enabled {
        let limiter = middleware::rate_limit::create_rate_limiter(
            config.rate_limit.requests_per_second,
            config.rate_limit.burst,
        )?;
        routes = routes.layer(from_fn_with_state(limiter, middleware::rate_limit::rate_limit));
    }

    let timeout_secs = config.server.request_timeout_secs;

    // Compose the app (each layer wraps everything above it)
    Ok(routes
        // Concurrency limit for backpressure; queueing counts against the timeout
        .layer(ConcurrencyLimitLayer::new(
            config.server.max_concurrent_requests.max(1),
        ))
        // Request timeout, rendered as the usual error body
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(move |err: BoxError| async move {
                    middleware_error(err, timeout_secs)
                }))
                .layer(TimeoutLayer::new(config.request_timeout())),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state))
}

/// Map a failure raised by the middleware stack to an `AppError`
fn middleware_error(err: BoxError, timeout_secs: u64) -> AppError {
    if err.is::<Elapsed>() {
        AppError::Internal {
            message: format!("request timed out after {}s", timeout_secs),
        }
    } else {
        AppError::Internal {
            message: format!("request failed: {}", err),
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
