use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    config::ServerConfig,
    mcp::{McpHandler, SERVER_NAME},
    runner::ProcessRunner,
};

/// Bind and serve until `shutdown` is cancelled. Scans still running at that
/// point are killed.
pub async fn serve(config: ServerConfig, shutdown: CancellationToken) -> Result<()> {
    let handler = McpHandler::new(config.invoker(), shutdown.clone());
    let app = router(handler, &config.path);

    let bind = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!(
        "serving MCP on http://{}{} (scanner: {}, timeout: {}s)",
        listener.local_addr()?,
        config.path,
        config.program,
        config.timeout.as_secs()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("http server failed")?;
    info!("server stopped");
    Ok(())
}

/// `POST <path>` takes one JSON-RPC message; `GET /health` is a liveness probe.
pub fn router<R: ProcessRunner + 'static>(handler: McpHandler<R>, path: &str) -> Router {
    Router::new()
        .route(path, post(post_rpc::<R>))
        .route("/health", get(health))
        .with_state(handler)
        .layer(TraceLayer::new_for_http())
}

async fn post_rpc<R: ProcessRunner + 'static>(
    State(handler): State<McpHandler<R>>,
    body: Bytes,
) -> Response {
    match handler.handle_bytes(&body).await {
        Some(resp) => (StatusCode::OK, Json(resp)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok", "name": SERVER_NAME })))
}
