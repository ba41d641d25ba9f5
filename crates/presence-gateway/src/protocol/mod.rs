//! Gateway wire protocol

mod messages;

pub use messages::{ClientMessage, ServerMessage, SubscribePayload, TypingPayload};
