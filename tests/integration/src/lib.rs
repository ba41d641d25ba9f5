//! Integration test utilities for the presence service
//!
//! This crate provides helpers for spawning the gateway on an ephemeral
//! port and driving it with a WebSocket client.

pub mod helpers;

pub use helpers::*;
