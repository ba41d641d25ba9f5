//! Gateway message format
//!
//! Defines the JSON structure for all WebSocket messages. Every message
//! carries an `"op"` discriminator with its payload fields inline.

use presence_common::ErrorResponse;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Typing mutation payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TypingPayload {
    /// Channel the user is typing in
    #[validate(length(min = 1, max = 128, message = "must be 1-128 characters"))]
    pub channel_id: String,
    /// User whose typing state changed
    #[validate(length(min = 1, max = 128, message = "must be 1-128 characters"))]
    pub user_id: String,
    /// Whether the user is typing
    pub typing: bool,
}

/// Subscribe/unsubscribe payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubscribePayload {
    /// Channel to observe
    #[validate(length(min = 1, max = 128, message = "must be 1-128 characters"))]
    pub channel_id: String,
}

/// Messages the client sends to the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Mark a user as typing or not typing (fire-and-forget)
    Typing(TypingPayload),
    /// Start streaming a channel's typist list
    Subscribe(SubscribePayload),
    /// Stop streaming a channel's typist list
    Unsubscribe(SubscribePayload),
}

impl ClientMessage {
    /// Parse a message from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Validate the message payload
    pub fn validate_payload(&self) -> Result<(), validator::ValidationErrors> {
        match self {
            Self::Typing(payload) => payload.validate(),
            Self::Subscribe(payload) | Self::Unsubscribe(payload) => payload.validate(),
        }
    }
}

/// Messages the gateway pushes to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once after connecting
    Hello { session_id: String },
    /// A channel's current typist list changed
    TypingUpdate {
        channel_id: String,
        user_ids: Vec<String>,
    },
    /// A client message was rejected
    Error { code: String, message: String },
}

impl ServerMessage {
    /// Create a Hello message
    #[must_use]
    pub fn hello(session_id: impl Into<String>) -> Self {
        Self::Hello {
            session_id: session_id.into(),
        }
    }

    /// Create a TypingUpdate message
    #[must_use]
    pub fn typing_update(channel_id: impl Into<String>, user_ids: Vec<String>) -> Self {
        Self::TypingUpdate {
            channel_id: channel_id.into(),
            user_ids,
        }
    }

    /// Create an Error message
    #[must_use]
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<ErrorResponse> for ServerMessage {
    fn from(response: ErrorResponse) -> Self {
        Self::Error {
            code: response.code,
            message: response.message,
        }
    }
}
