//! # Storage Queue HTTP Front Door
//!
//! A minimal HTTP service in front of a storage queue.
//!
//! - `POST|GET /api/DbCallOnQueue` enqueues `Hello, {name} {start_time}` onto
//!   the output queue and peeks the input queue
//! - `GET /health` reports liveness
//! - `GET /ready` checks that the output queue is reachable
//!
//! Queues are referenced by name on every request. They are only created when
//! `queues.create_queues_on_startup` is set.

pub mod config;
pub mod errors;

pub use config::{
    LoggingConfig, QueuesConfig, ServerConfig, ServiceConfig, StorageConfig, DEFAULT_INPUT_QUEUE,
    DEFAULT_OUTPUT_QUEUE,
};
pub use errors::{ApiError, ConfigError, ServiceError};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{Json, Response},
    routing::get,
    Router,
};
use bytes::Bytes;
use serde::Serialize;
use std::{
    future::{Future, IntoFuture},
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use storage_queue::{Message, QueueClient, QueueHandle, Timestamp};
use tokio::sync::oneshot;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, info_span, instrument, warn, Instrument};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration for the service
    pub config: ServiceConfig,

    /// Queue client shared by all requests
    pub client: Arc<dyn QueueClient>,

    /// Queue the greeting is enqueued onto
    pub output_queue: QueueHandle,

    /// Queue peeked on every request
    pub input_queue: QueueHandle,
}

impl AppState {
    /// Create new application state, referencing the configured queues
    pub fn new(config: ServiceConfig, client: Arc<dyn QueueClient>) -> Result<Self, ConfigError> {
        let output_queue = client.queue(config.queues.output_queue()?);
        let input_queue = client.queue(config.queues.input_queue()?);

        Ok(Self {
            config,
            client,
            output_queue,
            input_queue,
        })
    }

    /// Create the configured queues if they do not exist yet
    pub async fn ensure_queues(&self) -> Result<(), ServiceError> {
        for queue in [&self.output_queue, &self.input_queue] {
            self.client.ensure_queue(queue.name()).await?;
            info!(queue = %queue, "Queue ready");
        }
        Ok(())
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Create HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let queue_routes = Router::new().route(
        "/api/DbCallOnQueue",
        get(handle_db_call_on_queue).post(handle_db_call_on_queue),
    );

    let health_routes = Router::new()
        .route("/health", get(handle_health_check))
        .route("/ready", get(handle_readiness_check));

    let cors = if state.config.server.enable_cors {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };

    Router::new()
        .merge(queue_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    request_logging_middleware,
                ))
                .into_inner(),
        )
        .with_state(state)
}

/// Start HTTP server
///
/// After SIGINT or SIGTERM the server stops accepting connections and gives
/// in-flight requests `server.shutdown_timeout_seconds` to finish.
pub async fn start_server(
    config: ServiceConfig,
    client: Arc<dyn QueueClient>,
) -> Result<(), ServiceError> {
    let state = AppState::new(config.clone(), client)?;
    if config.queues.create_queues_on_startup {
        state.ensure_queues().await?;
    }

    let app = create_router(state);

    let address = format!("{}:{}", config.server.host, config.server.port);
    let addr: SocketAddr = address.parse().map_err(|e| {
        ServiceError::Configuration(ConfigError::Invalid {
            message: format!("invalid server address '{}': {}", address, e),
        })
    })?;
    let listener =
        tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServiceError::BindFailed {
                address: addr.to_string(),
                message: e.to_string(),
            })?;

    info!("Starting HTTP server on {}", addr);

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);
    let (signalled_tx, signalled_rx) = oneshot::channel();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        info!(
            timeout_seconds = shutdown_timeout.as_secs(),
            "Draining in-flight requests"
        );
        let _ = signalled_tx.send(());
    });

    serve_until_drained(server.into_future(), signalled_rx, shutdown_timeout).await?;

    info!("HTTP server shutdown complete");
    Ok(())
}

/// Drive `server` to completion, allowing at most `drain_timeout` once
/// `signalled` fires
///
/// A server still draining at the deadline is dropped, which closes the
/// remaining connections.
async fn serve_until_drained<F>(
    server: F,
    signalled: oneshot::Receiver<()>,
    drain_timeout: Duration,
) -> Result<(), ServiceError>
where
    F: Future<Output = std::io::Result<()>>,
{
    let to_service_error = |e: std::io::Error| ServiceError::ServerFailed {
        message: e.to_string(),
    };

    tokio::pin!(server);
    tokio::select! {
        result = &mut server => return result.map_err(to_service_error),
        Ok(()) = signalled => {}
    }

    match tokio::time::timeout(drain_timeout, server).await {
        Ok(result) => result.map_err(to_service_error),
        Err(_) => {
            warn!(
                timeout_seconds = drain_timeout.as_secs(),
                "Shutdown timeout reached with requests still in flight"
            );
            Ok(())
        }
    }
}

/// Resolves once SIGINT or SIGTERM arrives
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C)"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

// ============================================================================
// Queue Handlers
// ============================================================================

/// Enqueue a greeting for the posted name and peek the input queue
///
/// The body is a JSON string (`"Ada"`); anything that does not parse as one
/// is taken as plain text. The response is `200 OK` with an empty body.
#[instrument(skip(state, body))]
pub async fn handle_db_call_on_queue(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let started = Instant::now();
    let start_time = Timestamp::now();
    let name = parse_name(&body)?;

    let greeting = format!("Hello, {} {}", name, start_time);
    state
        .client
        .enqueue(&state.output_queue, Message::from_text(greeting))
        .await?;

    if let Some(peeked) = state.client.peek(&state.input_queue).await? {
        match peeked.body_text() {
            Ok(text) => info!(message_id = %peeked.message_id, "The peeked message is: {}", text),
            Err(e) => warn!(message_id = %peeked.message_id, error = %e, "Peeked message is not text"),
        }
    }

    info!(
        duration_seconds = started.elapsed().as_secs_f64(),
        "DbCallOnQueue took {:.3} seconds",
        started.elapsed().as_secs_f64()
    );
    Ok(StatusCode::OK)
}

/// Extract the name from a request body
pub fn parse_name(body: &[u8]) -> Result<String, ApiError> {
    if body.is_empty() {
        return Ok(String::new());
    }

    if let Ok(name) = serde_json::from_slice::<String>(body) {
        return Ok(name);
    }

    let text = std::str::from_utf8(body).map_err(|e| ApiError::InvalidBody {
        message: format!("body is neither a JSON string nor UTF-8 text: {}", e),
    })?;
    Ok(text.trim().to_string())
}

// ============================================================================
// Health Check Handlers
// ============================================================================

/// Health check response body
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub provider: String,
    pub timestamp: String,
    pub version: String,
}

/// Basic health check endpoint
#[instrument(skip(state))]
async fn handle_health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health_response(&state, "healthy"))
}

/// Readiness check: the output queue must exist and answer
#[instrument(skip(state))]
async fn handle_readiness_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, ApiError> {
    state.client.queue_properties(&state.output_queue).await?;
    Ok(Json(health_response(&state, "ready")))
}

fn health_response(state: &AppState, status: &str) -> HealthResponse {
    HealthResponse {
        status: status.to_string(),
        provider: state.client.provider_type().to_string(),
        timestamp: Timestamp::now().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Header carrying the correlation ID in both directions
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Request logging middleware with correlation ID propagation
///
/// Reuses the caller's `x-correlation-id` header or generates one, and
/// echoes it on the response. The request span carries the queues the
/// request may touch.
async fn request_logging_middleware(
    State(state): State<AppState>,
    mut request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let started = Instant::now();
    let correlation_id = request
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let span = info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        provider = %state.client.provider_type(),
        output_queue = %state.output_queue,
        input_queue = %state.input_queue,
        correlation_id = %correlation_id,
    );
    request.extensions_mut().insert(correlation_id.clone());

    async move {
        let mut response = next.run(request).await;
        if let Ok(value) = correlation_id.parse() {
            response.headers_mut().insert(CORRELATION_ID_HEADER, value);
        }

        log_completion(response.status(), started.elapsed().as_millis() as u64);
        response
    }
    .instrument(span)
    .await
}

/// Log a finished request at a level matching its status class
fn log_completion(status: StatusCode, duration_ms: u64) {
    match status.as_u16() {
        500..=599 => error!(status = %status, duration_ms, "Request failed"),
        400..=499 => warn!(status = %status, duration_ms, "Request rejected"),
        _ => info!(status = %status, duration_ms, "Request completed"),
    }
}
