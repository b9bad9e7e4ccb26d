use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::cli::config::Config;
use crate::decode::MAX_DECOMPRESSED_SIZE;
use crate::handler::{handle_logs, ExportLogsResponse};
use crate::pipeline::{PipelineClient, PipelineSender};
use crate::transform::LogsTransformer;

pub const LOGS_PATH: &str = "/v1/logs";

/// Initialize the tracing subscriber.
/// Uses RUST_LOG env var for filtering (defaults to info). Output goes to
/// stderr so stdout stays free for command output.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_ansi(true).with_writer(std::io::stderr))
            .init();
    }
}

struct AppState<S> {
    transformer: LogsTransformer,
    sender: S,
}

pub fn build_router<S: PipelineSender + 'static>(sender: S, transformer: LogsTransformer) -> Router {
    let state = Arc::new(AppState {
        transformer,
        sender,
    });

    Router::new()
        .route(
            "/",
            get(health).post(ingest::<S>).fallback(method_not_allowed),
        )
        .route(
            LOGS_PATH,
            get(health).post(ingest::<S>).fallback(method_not_allowed),
        )
        .fallback(fallback)
        .layer(DefaultBodyLimit::max(MAX_DECOMPRESSED_SIZE))
        .with_state(state)
}

/// Bind the configured address and serve until ctrl-c.
pub async fn serve(config: &Config) -> anyhow::Result<()> {
    let pipeline_url = config
        .pipeline_url
        .clone()
        .context("pipeline_url is required")?;
    let client = PipelineClient::new(
        pipeline_url,
        config.pipeline_token.clone(),
        config.send_timeout(),
    )
    .map_err(anyhow::Error::msg)?;
    let transformer = LogsTransformer::new().with_max_value_depth(config.max_value_depth);

    let addr = config.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(addr = %listener.local_addr()?, "OTLP receiver listening");

    axum::serve(listener, build_router(client, transformer))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("receiver stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "OTLP receiver is ready",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": { "logs": LOGS_PATH },
    }))
}

async fn ingest<S: PipelineSender + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let content_encoding = headers
        .get(header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok());

    match handle_logs(body, content_encoding, &state.transformer, &state.sender).await {
        Ok(_) => Json(ExportLogsResponse::accepted()).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "Internal server error",
                "message": e.to_string(),
            })),
        )
            .into_response(),
    }
}

async fn method_not_allowed() -> (StatusCode, &'static str) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        "Method not allowed. Use POST to send logs or GET for health check.",
    )
}

async fn fallback(method: Method) -> Response {
    match method {
        Method::GET => health().await.into_response(),
        Method::POST => (
            StatusCode::NOT_FOUND,
            "Not found. Use / or /v1/logs endpoint",
        )
            .into_response(),
        _ => method_not_allowed().await.into_response(),
    }
}
