use crate::app::App;
use crate::constants::network;
use crate::errors::ToolError;
use crate::mcp::server::McpServer;
use crate::services::config::AppConfig;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub fn router(server: Arc<McpServer>) -> Router {
    Router::new()
        .route(network::MCP_HTTP_PATH, post(mcp_handler))
        .route(network::HEALTH_PATH, get(health_handler))
        .with_state(server)
}

/// One JSON-RPC message per POST. Notifications are acknowledged with an
/// empty 202.
async fn mcp_handler(State(server): State<Arc<McpServer>>, body: String) -> Response {
    match server.handle_message(body.trim()).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

async fn health_handler(State(server): State<Arc<McpServer>>) -> Response {
    Json(server.app().health()).into_response()
}

pub async fn serve_on(listener: TcpListener, server: Arc<McpServer>) -> Result<(), ToolError> {
    let logger = server.app().logger.child("http");
    let local = listener.local_addr()?;
    logger.info(
        "HTTP transport listening",
        Some(&serde_json::json!({
            "addr": local.to_string(),
            "mcp_path": network::MCP_HTTP_PATH,
            "health_path": network::HEALTH_PATH,
        })),
    );
    axum::serve(listener, router(server))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    logger.info("HTTP transport stopped", None);
    Ok(())
}

pub async fn run_http(config: AppConfig) -> Result<(), ToolError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = App::initialize(config)?;
    let listener = TcpListener::bind(addr).await.map_err(|err| {
        ToolError::internal(format!("Failed to bind {}: {}", addr, err))
            .with_hint("Choose another port with --port or LETMECOUNT_MCP_PORT")
    })?;
    serve_on(listener, Arc::new(McpServer::new(Arc::new(app)))).await
}

async fn shutdown_signal() {
    // Without a signal handler, run until the process is killed.
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
