//! # Retry policy for event deliveries.
//!
//! [`RetryPolicy`] controls the per-event state machine:
//! - [`RetryPolicy::max_attempts`] bounds the total attempts started for one
//!   (subscriber, topic, event) triple before it is dead-lettered;
//! - [`RetryPolicy::delay`] is the fixed wait between a failed attempt and
//!   the next redelivery.
//!
//! Attempt #1 runs with zero delay; attempts #2..`max_attempts` each wait
//! `delay` first. There is no growth factor and no jitter: redelivery here
//! exists to ride out transient downstream failures, not to spread load.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use durabus::RetryPolicy;
//!
//! let policy = RetryPolicy::new(5, Duration::from_secs(5));
//!
//! // First attempt is immediate.
//! assert_eq!(policy.delay_before(1), None);
//! // Every later attempt waits the fixed delay.
//! assert_eq!(policy.delay_before(2), Some(Duration::from_secs(5)));
//!
//! // After five attempts the budget is spent.
//! assert!(!policy.is_exhausted(4));
//! assert!(policy.is_exhausted(5));
//! ```

use std::time::Duration;

use crate::config::BrokerConfig;

/// Bounded fixed-delay retry policy.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total attempts started before dead-lettering (min 1).
    pub max_attempts: u32,
    /// Fixed delay before each redelivery.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy with the given budget and delay.
    ///
    /// `max_attempts` is clamped to a minimum of 1.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Derives the policy from the broker configuration.
    pub fn from_config(cfg: &BrokerConfig) -> Self {
        Self::new(cfg.max_attempts_clamped(), cfg.redeliver_delay)
    }

    /// Returns the wait before the given attempt number (1-based).
    ///
    /// `None` for the first attempt (runs immediately), `Some(delay)` for
    /// every attempt after a failure.
    pub fn delay_before(&self, attempt: u32) -> Option<Duration> {
        if attempt <= 1 {
            None
        } else {
            Some(self.delay)
        }
    }

    /// True once `tries` attempts have been started and no more may run.
    pub fn is_exhausted(&self, tries: u32) -> bool {
        tries >= self.max_attempts
    }
}

impl Default for RetryPolicy {
    /// Returns the broker defaults: 5 attempts, 5 second delay.
    fn default() -> Self {
        Self::new(5, Duration::from_secs(5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_attempt_is_immediate() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_before(1), None);
        assert_eq!(policy.delay_before(0), None);
    }

    #[test]
    fn test_later_attempts_use_fixed_delay() {
        let policy = RetryPolicy::new(5, Duration::from_secs(5));
        for attempt in 2..=5 {
            assert_eq!(policy.delay_before(attempt), Some(Duration::from_secs(5)));
        }
    }

    #[test]
    fn test_exhaustion_boundary() {
        let policy = RetryPolicy::new(5, Duration::from_secs(5));
        assert!(!policy.is_exhausted(0));
        assert!(!policy.is_exhausted(4));
        assert!(policy.is_exhausted(5));
        assert!(policy.is_exhausted(6));
    }

    #[test]
    fn test_zero_budget_clamps_to_one() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        assert_eq!(policy.max_attempts, 1);
        assert!(policy.is_exhausted(1));
    }
}
