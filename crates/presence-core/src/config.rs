//! Tracker configuration

use std::time::Duration;

/// Default idle timeout before a typist is expired (3 seconds)
const DEFAULT_IDLE_TIMEOUT_MS: u64 = 3000;

/// Default interval between expiry sweep passes (3 seconds)
const DEFAULT_SWEEP_INTERVAL_MS: u64 = 3000;

/// Default per-channel event buffer size
const DEFAULT_EVENT_BUFFER: usize = 64;

/// Configuration for the typing tracker
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// How long a typist may stay silent before the sweep removes it
    pub idle_timeout: Duration,
    /// How often the background sweep runs
    pub sweep_interval: Duration,
    /// Buffer size of each channel's broadcast sender
    pub event_buffer: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_millis(DEFAULT_IDLE_TIMEOUT_MS),
            sweep_interval: Duration::from_millis(DEFAULT_SWEEP_INTERVAL_MS),
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl TrackerConfig {
    /// Create a configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the idle timeout
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the sweep interval
    #[must_use]
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Set the per-channel event buffer size
    ///
    /// Values below 1 are clamped to 1 (a broadcast channel cannot have
    /// a zero-sized buffer).
    #[must_use]
    pub fn event_buffer(mut self, size: usize) -> Self {
        self.event_buffer = size.max(1);
        self
    }
}
