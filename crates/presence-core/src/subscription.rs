//! Typing subscriptions
//!
//! Live snapshot streams handed out by [`TypingTracker::subscribe`].

use crate::tracker::{Snapshot, TypingTracker};
use std::sync::Weak;
use tokio::sync::broadcast;

/// A live subscription to one channel's typist list
///
/// Yields the current snapshot immediately, then one snapshot per content
/// change, de-duplicated against the last yielded value. The stream is
/// infinite while the tracker is alive; [`TypingSubscription::next`]
/// returns `None` only after the tracker has been dropped.
///
/// Dropping the subscription releases its listener registration, so a
/// disconnected client cannot leak fan-out capacity.
pub struct TypingSubscription {
    /// Channel this subscription observes
    channel_id: String,
    /// Snapshot captured at subscribe time, yielded first
    initial: Option<Snapshot>,
    /// Last snapshot yielded to the consumer
    last: Option<Snapshot>,
    /// Listener registration on the channel's broadcast sender
    receiver: broadcast::Receiver<Snapshot>,
    /// Used to resynchronize after receiver lag; weak so a forgotten
    /// subscription can never keep the tracker alive
    tracker: Weak<TypingTracker>,
}

impl TypingSubscription {
    pub(crate) fn new(
        channel_id: String,
        initial: Snapshot,
        receiver: broadcast::Receiver<Snapshot>,
        tracker: Weak<TypingTracker>,
    ) -> Self {
        Self {
            channel_id,
            initial: Some(initial),
            last: None,
            receiver,
            tracker,
        }
    }

    /// The channel this subscription observes
    #[must_use]
    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    /// Wait for the next snapshot
    ///
    /// Snapshots arrive in the order the underlying mutations were applied
    /// to this channel. Returns `None` once the tracker has been dropped.
    pub async fn next(&mut self) -> Option<Snapshot> {
        if let Some(initial) = self.initial.take() {
            self.last = Some(initial.clone());
            return Some(initial);
        }

        loop {
            match self.receiver.recv().await {
                Ok(snapshot) => {
                    if let Some(snapshot) = self.accept(snapshot) {
                        return Some(snapshot);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        channel_id = %self.channel_id,
                        skipped = skipped,
                        "Subscription lagged, resyncing to current snapshot"
                    );

                    // Skip the backlog entirely and catch up from the
                    // channel's live state.
                    self.receiver = self.receiver.resubscribe();
                    if let Some(tracker) = self.tracker.upgrade() {
                        let snapshot = tracker.typists(&self.channel_id);
                        // Drop anything that raced into the fresh receiver
                        // so a stale snapshot cannot follow the catch-up
                        // value.
                        loop {
                            match self.receiver.try_recv() {
                                Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => {}
                                Err(_) => break,
                            }
                        }
                        if let Some(snapshot) = self.accept(snapshot) {
                            return Some(snapshot);
                        }
                    }
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::debug!(
                        channel_id = %self.channel_id,
                        "Subscription closed, tracker is gone"
                    );
                    return None;
                }
            }
        }
    }

    /// Record a candidate snapshot, returning it only if its content
    /// differs from the last yielded value
    fn accept(&mut self, snapshot: Snapshot) -> Option<Snapshot> {
        if self.last.as_ref() == Some(&snapshot) {
            return None;
        }
        self.last = Some(snapshot.clone());
        Some(snapshot)
    }
}

impl std::fmt::Debug for TypingSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypingSubscription")
            .field("channel_id", &self.channel_id)
            .field("last", &self.last)
            .finish()
    }
}
