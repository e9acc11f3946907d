//! Polling cadence and the delay abstraction used while a remote file is
//! being processed.

use std::time::Duration;

use async_trait::async_trait;

/// Waits between polls. Injected so tests can run the state machine without
/// wall-clock delays.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// `Sleeper` backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Configuration for the processing poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Fixed delay before each status check.
    pub interval: Duration,
    /// Maximum number of status checks before giving up.
    pub max_polls: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::from_deadline(Duration::from_secs(5), Duration::from_secs(300))
    }
}

impl PollConfig {
    /// Derive the poll ceiling from an overall processing deadline.
    ///
    /// Always allows at least one poll.
    pub fn from_deadline(interval: Duration, deadline: Duration) -> Self {
        let interval_ms = interval.as_millis().max(1);
        let polls = deadline.as_millis().div_ceil(interval_ms);
        Self {
            interval,
            max_polls: polls.clamp(1, u32::MAX as u128) as u32,
        }
    }

    /// Set the poll interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the maximum number of polls.
    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = max_polls;
        self
    }

    /// Total time the loop may spend waiting.
    pub fn budget(&self) -> Duration {
        self.interval.saturating_mul(self.max_polls)
    }
}
