//! Server execution logic.

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::common::time::SystemClock;

use super::{
    handler::{health_check, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// Run the relay server until a shutdown signal arrives.
///
/// # Arguments
///
/// * `host` - The host address to bind to (e.g., "0.0.0.0")
/// * `port` - The port number to bind to (e.g., 3000)
pub async fn run_server(
    host: String,
    port: u16,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app_state = Arc::new(AppState::new(Arc::new(SystemClock)));

    let app = Router::new()
        .route("/ws", get(websocket_handler))
        .route("/api/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let bind_addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("Chess relay server listening on {}", listener.local_addr()?);
    tracing::info!("Connect to: ws://{}/ws", bind_addr);
    tracing::info!("Press Ctrl+C to shutdown gracefully");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}
