//! cosmos-injector server library logic.
//!
//! Exposes the notification endpoint that feeds the in-memory channel and
//! wires that channel to an HDFS-backed sink runner.

pub mod config;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use cosmos_hdfs::{BackendError, HdfsBackend};
use cosmos_sink::{ChannelError, IntakeLoop, MemoryChannel, SinkRunner};
use cosmos_types::{RawEvent, CONTENT_TYPE_HEADER};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, LoggingConfig};

/// Request headers copied onto the raw event besides `Content-Type`.
pub const FORWARDED_HEADERS: [&str; 2] = ["fiware-service", "fiware-servicepath"];

/// Application state shared across request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Producer handle of the channel drained by the sink runner.
    pub channel: MemoryChannel,
}

/// Health check handler.
///
/// Returns `200 OK` with server status and version. It never touches the
/// channel or the sink.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Accepts one context-broker notification and queues it for the sink.
///
/// The body is not parsed here; a payload the normalizer cannot read is
/// rolled back by the sink and logged there.
async fn notify(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let mut event = RawEvent::new(body.to_vec());
    if let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    {
        event = event.with_header(CONTENT_TYPE_HEADER, content_type);
    }
    for name in FORWARDED_HEADERS {
        if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
            event = event.with_header(name, value);
        }
    }

    match state.channel.put(event) {
        Ok(()) => {
            tracing::debug!(queued = state.channel.len(), "notification accepted");
            StatusCode::OK.into_response()
        }
        Err(err @ ChannelError::Full { .. }) => {
            tracing::warn!(error = %err, "notification refused");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response()
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to queue notification");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response()
        }
    }
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/notify", post(notify))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Builds the HDFS backend and the runner that drains `channel` into it.
///
/// # Errors
///
/// Returns `BackendError::Config` if the HDFS settings are unusable.
pub fn build_runner(
    config: &Config,
    channel: MemoryChannel,
) -> Result<SinkRunner<MemoryChannel, HdfsBackend>, BackendError> {
    let backend = HdfsBackend::new(config.hdfs.clone())?;
    tracing::info!(
        api = %config.hdfs.api,
        host = %config.hdfs.host,
        port = config.hdfs.port,
        username = %config.hdfs.username,
        dataset = %config.hdfs.dataset,
        "configured HDFS backend"
    );
    Ok(SinkRunner::new(
        IntakeLoop::new(channel, backend),
        config.sink.backoff_policy(),
    ))
}

/// Installs the global tracing subscriber.
pub fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
