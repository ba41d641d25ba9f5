//! Gateway state
//!
//! Application state for the gateway server.

use crate::connection::SessionManager;
use presence_common::AppConfig;
use presence_core::TypingTracker;
use std::sync::Arc;

/// Gateway application state
///
/// Holds all shared dependencies for the gateway server.
#[derive(Clone)]
pub struct GatewayState {
    /// Typing presence tracker
    tracker: Arc<TypingTracker>,
    /// Session manager for WebSocket connections
    sessions: Arc<SessionManager>,
    /// Application configuration
    config: Arc<AppConfig>,
}

impl GatewayState {
    /// Create a new gateway state
    pub fn new(
        tracker: Arc<TypingTracker>,
        sessions: Arc<SessionManager>,
        config: AppConfig,
    ) -> Self {
        Self {
            tracker,
            sessions,
            config: Arc::new(config),
        }
    }

    /// Get the typing tracker
    pub fn tracker(&self) -> &Arc<TypingTracker> {
        &self.tracker
    }

    /// Get the session manager
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Get the application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("tracker", &self.tracker)
            .field("sessions", &self.sessions)
            .finish()
    }
}
