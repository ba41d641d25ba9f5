//! Gateway server setup
//!
//! Provides the main WebSocket server configuration and routes.

mod handler;
mod state;

pub use handler::gateway_handler;
pub use state::GatewayState;

use crate::connection::SessionManager;
use axum::{extract::State, routing::get, Json, Router};
use presence_common::{AppConfig, AppError};
use presence_core::{TrackerConfig, TypingTracker};
use serde::Serialize;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/gateway", get(gateway_handler))
        .route("/health", get(health_check))
}

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    sessions: usize,
    subscriptions: usize,
    channels: usize,
}

/// Health check endpoint
async fn health_check(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        sessions: state.sessions().session_count(),
        subscriptions: state.sessions().subscription_count(),
        channels: state.tracker().channel_count(),
    })
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Initialize all dependencies and create `GatewayState`
///
/// Starts the tracker's background sweep; the caller owns the state and
/// must call `tracker().shutdown()` on teardown.
pub fn create_gateway_state(config: AppConfig) -> GatewayState {
    let tracker_config = TrackerConfig::new()
        .idle_timeout(Duration::from_millis(config.typing.idle_timeout_ms))
        .sweep_interval(Duration::from_millis(config.typing.sweep_interval_ms))
        .event_buffer(config.typing.event_buffer);

    let tracker = TypingTracker::new_shared(tracker_config);
    tracker.start();

    let sessions = SessionManager::new_shared();

    GatewayState::new(tracker, sessions, config)
}

/// Run the gateway server until a shutdown signal arrives
pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), AppError> {
    tracing::info!("Starting Gateway server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("Gateway listening on ws://{}/gateway", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")))?;

    Ok(())
}

/// Wait for ctrl-c
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

/// Run the complete gateway server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr: SocketAddr = config
        .gateway
        .address()
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid gateway address: {e}")))?;

    // Create gateway state
    let state = create_gateway_state(config);

    // Build application
    let app = create_app(state.clone());

    // Run server
    let result = run_server(app, addr).await;

    // Stop the background sweep before exiting
    state.tracker().shutdown().await;

    result
}
