//! Connection handling

mod manager;

pub use manager::{SessionHandle, SessionManager};
