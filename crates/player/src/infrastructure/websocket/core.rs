//! Platform-agnostic core logic for the game WebSocket client.
//!
//! Free of any runtime dependencies; the supervisor owns the socket and calls
//! into this core for reconnection backoff math.

use std::time::Duration;

use super::shared::{DEFAULT_RECONNECT_DELAY_MS, MAX_RETRY_ATTEMPTS};

/// Linear backoff state shared by reconnect logic.
///
/// The wait before retry `n` is `base_delay * n`, for at most `max_attempts`
/// retries.
#[derive(Debug, Clone, Copy)]
pub struct BackoffState {
    attempts: u32,
    base_delay: Duration,
    max_attempts: u32,
}

impl Default for BackoffState {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
            MAX_RETRY_ATTEMPTS,
        )
    }
}

impl BackoffState {
    pub fn new(base_delay: Duration, max_attempts: u32) -> Self {
        Self {
            attempts: 0,
            base_delay,
            max_attempts,
        }
    }

    /// Called once a link opens successfully
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Advance to the next attempt.
    ///
    /// Returns the delay to wait *before* performing this attempt, or `None`
    /// once the retry budget is spent.
    pub fn next_delay_and_advance(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }

        self.attempts += 1;
        Some(self.base_delay * self.attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_grows_linearly_with_attempt_number() {
        let mut backoff = BackoffState::new(Duration::from_millis(2_000), 5);

        let delays: Vec<_> = std::iter::from_fn(|| backoff.next_delay_and_advance()).collect();

        assert_eq!(
            delays,
            vec![
                Duration::from_millis(2_000),
                Duration::from_millis(4_000),
                Duration::from_millis(6_000),
                Duration::from_millis(8_000),
                Duration::from_millis(10_000),
            ]
        );
        assert!(backoff.is_exhausted());
        assert_eq!(backoff.next_delay_and_advance(), None);
    }

    #[test]
    fn test_reset_restores_budget() {
        let mut backoff = BackoffState::default();
        backoff.next_delay_and_advance();
        backoff.next_delay_and_advance();
        assert_eq!(backoff.attempts(), 2);

        backoff.reset();

        assert_eq!(backoff.attempts(), 0);
        assert_eq!(
            backoff.next_delay_and_advance(),
            Some(Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS))
        );
    }
}
