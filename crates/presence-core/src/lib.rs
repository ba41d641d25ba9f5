//! # presence-core
//!
//! In-process typing presence tracking.
//!
//! Maintains per-channel sets of currently-typing users, expires idle
//! entries on a background sweep, and fans out snapshot updates to live
//! subscriptions. Nothing here is persisted; a process restart drops all
//! presence state.
//!
//! ## Example
//!
//! ```ignore
//! use presence_core::{TrackerConfig, TypingTracker};
//!
//! let tracker = TypingTracker::new_shared(TrackerConfig::default());
//! tracker.start();
//!
//! let mut sub = tracker.subscribe("landing");
//! tracker.set_typing("landing", "alice", true);
//!
//! // First value is the current snapshot, then one value per change.
//! while let Some(user_ids) = sub.next().await {
//!     println!("typing: {user_ids:?}");
//! }
//!
//! tracker.shutdown().await;
//! ```

pub mod config;
pub mod subscription;
pub mod tracker;

pub use config::TrackerConfig;
pub use subscription::TypingSubscription;
pub use tracker::{Snapshot, TypingTracker};
