use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    mcp::{code, McpHandler, RpcResponse, SERVER_NAME},
    tool::TOOL_NAME,
};

/// Ceiling for one HTTP request, tool call included.
pub const DEFAULT_MAX_DURATION: Duration = Duration::from_secs(300);

#[derive(Clone)]
pub struct AppState {
    handler: Arc<McpHandler>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Status {
    pub name: &'static str,
    pub version: &'static str,
    pub tool: &'static str,
    pub binary: String,
    pub max_output_bytes: Option<usize>,
}

/// Build the HTTP app. `max_duration` of `None` disables the request ceiling.
///
/// - `POST /mcp`: one JSON-RPC message in, one JSON response out (202 for notifications)
/// - `GET|DELETE /mcp`: 405, there is no event stream and no session to end
/// - `GET /status`: server and runner configuration
pub fn router(handler: McpHandler, max_duration: Option<Duration>) -> Router {
    let state = AppState {
        handler: Arc::new(handler),
    };

    let app = Router::new()
        .route(
            "/mcp",
            post(post_mcp).get(method_not_allowed).delete(method_not_allowed),
        )
        .route("/status", get(get_status))
        .with_state(state);

    let app = match max_duration {
        Some(limit) => app.layer(TimeoutLayer::new(limit)),
        None => app,
    };
    app.layer(TraceLayer::new_for_http())
}

pub async fn spawn_server(bind: &str, handler: McpHandler, max_duration: Option<Duration>) -> Result<()> {
    let app = router(handler, max_duration);
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;

    info!(addr = %listener.local_addr()?, "serving MCP on http://{}/mcp", bind);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

async fn post_mcp(State(app): State<AppState>, body: Bytes) -> Response {
    match app.handler.handle_bytes(&body).await {
        Some(resp) => (StatusCode::OK, Json(resp)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(RpcResponse::failure(
            Value::Null,
            code::INVALID_REQUEST,
            "method not allowed: only POST is supported",
        )),
    )
}

async fn get_status(State(app): State<AppState>) -> impl IntoResponse {
    let runner = app.handler.tool().runner();
    let out = Status {
        name: SERVER_NAME,
        version: env!("CARGO_PKG_VERSION"),
        tool: TOOL_NAME,
        binary: runner.binary().display().to_string(),
        max_output_bytes: runner.max_output_bytes(),
    };
    (StatusCode::OK, Json(out))
}
