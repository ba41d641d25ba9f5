//! Session manager
//!
//! Tracks all active WebSocket sessions and the subscription forwarder
//! tasks each one owns, using DashMap for thread-safe access.

use crate::protocol::ServerMessage;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// One connected client
///
/// Owns the outgoing message channel and the forwarder task of every
/// channel subscription this session holds. Removing or replacing a
/// subscription aborts its forwarder, which drops the underlying tracker
/// subscription and releases its listener registration.
pub struct SessionHandle {
    /// Session ID
    session_id: String,
    /// Outgoing message channel to the send task
    outbox: mpsc::Sender<ServerMessage>,
    /// Channel ID to forwarder task
    subscriptions: parking_lot::Mutex<HashMap<String, JoinHandle<()>>>,
}

impl SessionHandle {
    fn new(session_id: String, outbox: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            session_id,
            outbox,
            subscriptions: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    /// Generate a new session ID
    #[must_use]
    pub fn generate_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Get the session ID
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Get a clone of the outgoing message sender
    #[must_use]
    pub fn outbox(&self) -> mpsc::Sender<ServerMessage> {
        self.outbox.clone()
    }

    /// Queue a message for delivery to this session
    pub async fn send(
        &self,
        message: ServerMessage,
    ) -> Result<(), mpsc::error::SendError<ServerMessage>> {
        self.outbox.send(message).await
    }

    /// Register a subscription forwarder for a channel
    ///
    /// A duplicate subscribe replaces the previous forwarder, which is
    /// aborted so the old stream cannot keep delivering.
    pub fn add_subscription(&self, channel_id: String, task: JoinHandle<()>) {
        let mut subscriptions = self.subscriptions.lock();
        if let Some(previous) = subscriptions.insert(channel_id.clone(), task) {
            previous.abort();
            tracing::debug!(
                session_id = %self.session_id,
                channel_id = %channel_id,
                "Replaced existing subscription"
            );
        }
    }

    /// Remove a channel subscription, aborting its forwarder
    ///
    /// Returns false if the session was not subscribed to the channel.
    pub fn remove_subscription(&self, channel_id: &str) -> bool {
        let task = self.subscriptions.lock().remove(channel_id);
        match task {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    /// Abort all subscription forwarders
    pub fn clear_subscriptions(&self) -> usize {
        let mut subscriptions = self.subscriptions.lock();
        let count = subscriptions.len();
        for (_, task) in subscriptions.drain() {
            task.abort();
        }
        count
    }

    /// Check if this session is subscribed to a channel
    #[must_use]
    pub fn is_subscribed(&self, channel_id: &str) -> bool {
        self.subscriptions.lock().contains_key(channel_id)
    }

    /// Number of active subscriptions
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().len()
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        for (_, task) in self.subscriptions.lock().drain() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("session_id", &self.session_id)
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}

/// Manages all active WebSocket sessions
pub struct SessionManager {
    /// Active sessions by session ID
    sessions: DashMap<String, Arc<SessionHandle>>,
}

impl SessionManager {
    /// Create a new session manager
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Create a new session manager wrapped in Arc
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a new session
    pub fn register(
        &self,
        session_id: String,
        outbox: mpsc::Sender<ServerMessage>,
    ) -> Arc<SessionHandle> {
        let session = Arc::new(SessionHandle::new(session_id.clone(), outbox));
        self.sessions.insert(session_id.clone(), session.clone());

        tracing::debug!(session_id = %session_id, "Session registered");

        session
    }

    /// Remove a session, aborting all its subscription forwarders
    pub fn remove(&self, session_id: &str) {
        if let Some((_, session)) = self.sessions.remove(session_id) {
            let cleared = session.clear_subscriptions();
            tracing::debug!(
                session_id = %session_id,
                subscriptions = cleared,
                "Session removed"
            );
        }
    }

    /// Get a session by ID
    pub fn get(&self, session_id: &str) -> Option<Arc<SessionHandle>> {
        self.sessions.get(session_id).map(|r| r.clone())
    }

    /// Check if a session exists
    pub fn has_session(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    /// Number of active sessions
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Total number of subscriptions across all sessions
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.sessions
            .iter()
            .map(|session| session.subscription_count())
            .sum()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("sessions", &self.sessions.len())
            .finish()
    }
}
