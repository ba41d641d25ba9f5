//! # presence-gateway
//!
//! WebSocket gateway exposing the typing presence tracker: a `typing`
//! mutation plus `subscribe`/`unsubscribe` streaming over a JSON protocol.

pub mod connection;
pub mod protocol;
pub mod server;

pub use server::run;
