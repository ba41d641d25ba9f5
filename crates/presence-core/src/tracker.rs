//! Typing tracker
//!
//! Tracks who is typing per channel, expires idle typists on a background
//! sweep, and broadcasts snapshot updates to subscribers.

use crate::config::TrackerConfig;
use crate::subscription::TypingSubscription;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};

/// Sorted, deduplicated list of user IDs currently typing in a channel
pub type Snapshot = Vec<String>;

/// Per-channel typing state
///
/// Holds the typist map and the broadcast sender that fans out snapshot
/// updates to every live subscription on this channel.
struct ChannelEntry {
    /// User ID to last-typed timestamp
    typists: HashMap<String, Instant>,
    /// Snapshot fan-out for this channel's subscribers
    events: broadcast::Sender<Snapshot>,
}

impl ChannelEntry {
    fn new(event_buffer: usize) -> Self {
        let (events, _) = broadcast::channel(event_buffer);
        Self {
            typists: HashMap::new(),
            events,
        }
    }

    /// Sorted list of user IDs currently typing
    fn snapshot(&self) -> Snapshot {
        let mut user_ids: Vec<String> = self.typists.keys().cloned().collect();
        user_ids.sort_unstable();
        user_ids
    }

    /// Emit the current snapshot (silent no-op with zero subscribers)
    fn emit(&self) {
        let _ = self.events.send(self.snapshot());
    }
}

/// In-process typing presence tracker
///
/// One instance is created at startup, held for the process lifetime, and
/// shut down (stopping the sweep task) at teardown. All state lives in
/// memory and is lost on restart.
pub struct TypingTracker {
    /// Channel ID to typing state
    channels: DashMap<String, ChannelEntry>,
    /// Tracker configuration
    config: TrackerConfig,
    /// Whether the sweep task is running
    running: AtomicBool,
    /// Wakes the sweep task for prompt shutdown
    shutdown: Notify,
    /// Handle of the spawned sweep task
    sweeper: parking_lot::Mutex<Option<JoinHandle<()>>>,
    /// Weak self-reference handed to subscriptions for lag recovery;
    /// empty unless constructed through [`TypingTracker::new_shared`]
    self_ref: Weak<TypingTracker>,
}

impl TypingTracker {
    /// Create a new tracker
    ///
    /// The background sweep is not started until [`TypingTracker::start`]
    /// is called.
    #[must_use]
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            channels: DashMap::new(),
            config,
            running: AtomicBool::new(false),
            shutdown: Notify::new(),
            sweeper: parking_lot::Mutex::new(None),
            self_ref: Weak::new(),
        }
    }

    /// Create a new tracker wrapped in Arc
    ///
    /// This is the normal constructor: subscriptions created from a
    /// shared tracker can resynchronize after receiver lag.
    #[must_use]
    pub fn new_shared(config: TrackerConfig) -> Arc<Self> {
        Arc::new_cyclic(|weak| {
            let mut tracker = Self::new(config);
            tracker.self_ref = weak.clone();
            tracker
        })
    }

    /// Mark a user as typing or not typing in a channel
    ///
    /// `typing = true` inserts or refreshes the user's last-typed timestamp;
    /// `typing = false` removes the user (no-op if absent). Either way the
    /// channel's current snapshot is emitted afterwards; subscriptions
    /// de-duplicate by content, so no-op removals produce no visible push.
    ///
    /// Unknown channels are created implicitly, never rejected.
    pub fn set_typing(&self, channel_id: &str, user_id: &str, typing: bool) {
        let mut entry = self
            .channels
            .entry(channel_id.to_string())
            .or_insert_with(|| ChannelEntry::new(self.config.event_buffer));

        if typing {
            entry.typists.insert(user_id.to_string(), Instant::now());
        } else {
            entry.typists.remove(user_id);
        }

        // Emitting while the shard lock is held keeps per-channel snapshots
        // in mutation order.
        entry.emit();

        tracing::trace!(
            channel_id = %channel_id,
            user_id = %user_id,
            typing = typing,
            typists = entry.typists.len(),
            "Typing state updated"
        );
    }

    /// Subscribe to a channel's typist list
    ///
    /// The first value yielded is the current snapshot (possibly empty for
    /// an unseen channel), then one value per content change. Dropping the
    /// subscription unregisters its listener.
    pub fn subscribe(&self, channel_id: &str) -> TypingSubscription {
        let entry = self
            .channels
            .entry(channel_id.to_string())
            .or_insert_with(|| ChannelEntry::new(self.config.event_buffer));

        let receiver = entry.events.subscribe();
        let initial = entry.snapshot();
        drop(entry);

        tracing::debug!(channel_id = %channel_id, "Subscription created");

        TypingSubscription::new(
            channel_id.to_string(),
            initial,
            receiver,
            self.self_ref.clone(),
        )
    }

    /// Current snapshot for a channel
    ///
    /// Returns an empty list for an unseen channel.
    #[must_use]
    pub fn typists(&self, channel_id: &str) -> Snapshot {
        self.channels
            .get(channel_id)
            .map(|entry| entry.snapshot())
            .unwrap_or_default()
    }

    /// Check whether a user is currently typing in a channel
    #[must_use]
    pub fn is_typing(&self, channel_id: &str, user_id: &str) -> bool {
        self.channels
            .get(channel_id)
            .is_some_and(|entry| entry.typists.contains_key(user_id))
    }

    /// Number of tracked channels
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of live subscriptions on a channel
    #[must_use]
    pub fn subscriber_count(&self, channel_id: &str) -> usize {
        self.channels
            .get(channel_id)
            .map_or(0, |entry| entry.events.receiver_count())
    }

    /// Total number of live subscriptions across all channels
    #[must_use]
    pub fn total_subscriber_count(&self) -> usize {
        self.channels
            .iter()
            .map(|entry| entry.events.receiver_count())
            .sum()
    }

    /// Start the background expiry sweep
    ///
    /// Spawns a task that expires idle typists every `sweep_interval`.
    /// Calling this more than once is a no-op.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::warn!("Typing sweep is already running");
            return;
        }

        let tracker = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tracker.run_sweeper().await;
        });
        *self.sweeper.lock() = Some(handle);

        tracing::info!(
            idle_timeout_ms = self.config.idle_timeout.as_millis() as u64,
            sweep_interval_ms = self.config.sweep_interval.as_millis() as u64,
            "Typing sweep started"
        );
    }

    /// Stop the background sweep and wait for it to finish
    pub async fn shutdown(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        self.shutdown.notify_waiters();

        let handle = self.sweeper.lock().take();
        if let Some(handle) = handle {
            handle.await.ok();
        }

        tracing::info!("Typing sweep stopped");
    }

    /// Check if the sweep task is running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Sweep loop: tick, expire, repeat until shutdown
    async fn run_sweeper(&self) {
        let mut ticker = interval(self.config.sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick of an interval completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !self.running.load(Ordering::SeqCst) {
                        break;
                    }
                    self.expire_idle();
                }
                () = self.shutdown.notified() => break,
            }
        }

        tracing::debug!("Typing sweep loop ended");
    }

    /// Expire typists idle longer than the configured timeout
    ///
    /// Emits at most one batched snapshot per channel that lost at least
    /// one typist, and drops channel entries that have neither typists nor
    /// subscribers. Returns the number of channels with removals.
    pub(crate) fn expire_idle(&self) -> usize {
        let now = Instant::now();
        let idle_timeout = self.config.idle_timeout;
        let mut affected = 0usize;

        for mut entry in self.channels.iter_mut() {
            let before = entry.typists.len();
            entry
                .value_mut()
                .typists
                .retain(|_, last_typed| now.duration_since(*last_typed) <= idle_timeout);

            if entry.typists.len() != before {
                affected += 1;
                entry.emit();

                tracing::trace!(
                    channel_id = %entry.key(),
                    expired = before - entry.typists.len(),
                    "Expired idle typists"
                );
            }
        }

        // Drop channels nobody touches anymore so the map stays bounded
        // under churny channel IDs.
        self.channels
            .retain(|_, entry| !entry.typists.is_empty() || entry.events.receiver_count() > 0);

        if affected > 0 {
            tracing::debug!(channels = affected, "Sweep pass expired typists");
        }

        affected
    }
}

impl Drop for TypingTracker {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for TypingTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypingTracker")
            .field("channels", &self.channels.len())
            .field("running", &self.is_running())
            .finish()
    }
}
