//! # Global broker configuration.
//!
//! Provides [`BrokerConfig`], the centralized settings for the broker runtime.
//!
//! Config is used in two ways:
//! 1. **Broker creation**: `Broker::builder(config)`
//! 2. **Retry policy**: [`RetryPolicy::from_config`](crate::policies::RetryPolicy::from_config)
//!
//! ## Sentinel values
//! - `handler_timeout = 0s` → no per-attempt timeout enforcement
//! - `grace = 0s` → shutdown does not wait for in-flight deliveries

use std::time::Duration;

/// Global configuration for the broker runtime.
///
/// Defines:
/// - **Retry behavior**: attempt budget and fixed redelivery delay
/// - **Timeout enforcement**: per-attempt handler timeout
/// - **Event system**: notice bus capacity
/// - **Shutdown behavior**: grace period for in-flight deliveries
///
/// ## Field semantics
/// - `max_attempts`: total attempts per event before dead-lettering (min 1)
/// - `redeliver_delay`: fixed wait between a failed attempt and the next one
/// - `handler_timeout`: per-attempt handler deadline (`0s` = no timeout)
/// - `bus_capacity`: notice bus ring buffer size (min 1; clamped by Bus)
/// - `grace`: maximum wait for in-flight deliveries at shutdown
#[derive(Clone, Debug)]
pub struct BrokerConfig {
    /// Total attempts per (subscriber, topic, event) before dead-lettering.
    ///
    /// The first attempt runs immediately; each subsequent attempt runs after
    /// `redeliver_delay`. Once `tries` reaches this budget the event is moved
    /// to the dead-letter record and never retried again.
    pub max_attempts: u32,

    /// Fixed delay between a failed attempt and the next redelivery.
    pub redeliver_delay: Duration,

    /// Per-attempt handler deadline.
    ///
    /// - `Duration::ZERO` = no timeout (handler runs until it settles)
    /// - `> 0` = the attempt is raced against this deadline; elapsing counts
    ///   as a failed attempt and enters the same retry path
    pub handler_timeout: Duration,

    /// Capacity of the notice bus broadcast channel ring buffer.
    ///
    /// Slow receivers that lag behind more than `bus_capacity` notices will
    /// observe `Lagged` and recover missed work from the durable queue.
    pub bus_capacity: usize,

    /// Maximum time to wait for in-flight deliveries at shutdown before
    /// force-terminating and returning `BrokerError::GraceExceeded`.
    pub grace: Duration,
}

impl BrokerConfig {
    /// Returns the attempt budget clamped to a minimum of 1.
    #[inline]
    pub fn max_attempts_clamped(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Returns the per-attempt handler timeout as an `Option`.
    ///
    /// - `None` → no timeout
    /// - `Some(d)` → deadline applied per attempt
    #[inline]
    pub fn handler_timeout_opt(&self) -> Option<Duration> {
        if self.handler_timeout == Duration::ZERO {
            None
        } else {
            Some(self.handler_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for BrokerConfig {
    /// Default configuration:
    ///
    /// - `max_attempts = 5`
    /// - `redeliver_delay = 5s`
    /// - `handler_timeout = 5s`
    /// - `bus_capacity = 1024`
    /// - `grace = 30s`
    fn default() -> Self {
        Self {
            max_attempts: 5,
            redeliver_delay: Duration::from_secs(5),
            handler_timeout: Duration::from_secs(5),
            bus_capacity: 1024,
            grace: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_accessors() {
        let mut cfg = BrokerConfig::default();
        assert_eq!(cfg.handler_timeout_opt(), Some(Duration::from_secs(5)));

        cfg.handler_timeout = Duration::ZERO;
        assert_eq!(cfg.handler_timeout_opt(), None);

        cfg.bus_capacity = 0;
        assert_eq!(cfg.bus_capacity_clamped(), 1);

        cfg.max_attempts = 0;
        assert_eq!(cfg.max_attempts_clamped(), 1);
    }
}
