use std::time::Duration;

use tokio_retry::strategy::{jitter, ExponentialBackoff};

/// Bounded retry policy applied to retryable summarization failures
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

impl RetryPolicy {
    /// `max_attempts` counts the first attempt and is clamped to at least 1
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
            jitter: true,
        }
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max.max(initial);
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Delays to wait before attempts 2..=max_attempts: `initial_backoff`,
    /// then doubling up to `max_backoff`, at millisecond resolution.
    pub fn backoff_schedule(&self) -> impl Iterator<Item = Duration> {
        let initial_ms = u64::try_from(self.initial_backoff.as_millis()).unwrap_or(u64::MAX);
        let initial = Duration::from_millis(initial_ms).min(self.max_backoff);
        let use_jitter = self.jitter;

        // ExponentialBackoff yields `factor * base^n` ms for n = 1, 2, ..
        std::iter::once(initial)
            .chain(
                ExponentialBackoff::from_millis(2)
                    .factor(initial_ms)
                    .max_delay(self.max_backoff),
            )
            .map(move |delay| if use_jitter { jitter(delay) } else { delay })
            .take(self.max_attempts.saturating_sub(1) as usize)
    }

    /// Applies a provider supplied `retry_after` as a lower bound, capped at
    /// `max_backoff` so a retry loop always stays bounded.
    pub fn delay_before_retry(&self, scheduled: Duration, retry_after: Option<Duration>) -> Duration {
        match retry_after {
            Some(retry_after) => scheduled.max(retry_after.min(self.max_backoff)),
            None => scheduled,
        }
    }
}
