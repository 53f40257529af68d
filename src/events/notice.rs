//! # Runtime notices emitted by the broker and delivery actors.
//!
//! The [`NoticeKind`] enum classifies notice types across four categories:
//! - **Publish notices**: a new event entered the system
//! - **Delivery notices**: per-attempt lifecycle (started, succeeded, failed,
//!   timed out, redelivery scheduled, dead-lettered)
//! - **Setup notices**: subscriber registration and subscription establishment
//! - **Observer notices**: observer worker overflow/panic isolation
//!
//! The [`Notice`] struct carries optional metadata: topic, subscriber,
//! event id, attempt count, delays, reasons, and (for publish notices) the
//! event payload itself so delivery actors can process live events without
//! re-reading the log.
//!
//! ## Ordering guarantees
//! Each notice has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore order when notices are observed out
//! of order.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde_json::Value;

use super::event::{Domain, Topic};

/// Global sequence counter for notice ordering.
static NOTICE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of broker notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    // === Publish notices ===
    /// An event was durably logged and fanned out.
    ///
    /// Sets: `topic`, `event_id`, `content`.
    EventPublished,

    // === Delivery notices ===
    /// A delivery attempt is starting (tries already incremented).
    ///
    /// Sets: `subscriber`, `topic`, `event_id`, `attempt`.
    DeliveryStarted,

    /// The handler completed and the event was acknowledged.
    ///
    /// Sets: `subscriber`, `topic`, `event_id`, `attempt`.
    DeliverySucceeded,

    /// The handler rejected the event for this attempt.
    ///
    /// Sets: `subscriber`, `topic`, `event_id`, `attempt`, `reason`.
    DeliveryFailed,

    /// The handler exceeded the configured per-attempt timeout.
    ///
    /// Published in addition to `DeliveryFailed` for the same attempt.
    /// Sets: `subscriber`, `topic`, `event_id`, `attempt`, `timeout_ms`.
    DeliveryTimedOut,

    /// A redelivery was scheduled after a failed attempt.
    ///
    /// Sets: `subscriber`, `topic`, `event_id`, `attempt`, `delay_ms`.
    RedeliveryScheduled,

    /// The retry budget was exhausted; the event was dead-lettered.
    ///
    /// Sets: `subscriber`, `topic`, `event_id`, `attempt`.
    DeadLettered,

    // === Setup notices ===
    /// A domain registered a subscriber.
    ///
    /// Sets: `subscriber`.
    SubscriberRegistered,

    /// A (domain, topic) subscription was established and its backlog
    /// dispatched.
    ///
    /// Sets: `subscriber`, `topic`.
    SubscriptionEstablished,

    // === Observer notices ===
    /// An observer dropped a notice (queue full or worker closed).
    ///
    /// Sets: `reason`.
    ObserverOverflow,

    /// An observer panicked while processing a notice.
    ///
    /// Sets: `reason`.
    ObserverPanicked,

    // === Shutdown ===
    /// Broker shutdown was requested; actors are being cancelled.
    ShutdownRequested,
}

/// Broker notice with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`NoticeKind`]
#[derive(Clone, Debug)]
pub struct Notice {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Notice classification.
    pub kind: NoticeKind,

    /// Topic, if applicable.
    pub topic: Option<Topic>,
    /// Subscriber domain, if applicable.
    pub subscriber: Option<Domain>,
    /// Event id, if applicable.
    pub event_id: Option<Arc<str>>,
    /// Attempt count (starting from 1).
    pub attempt: Option<u32>,
    /// Redelivery delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Handler timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Human-readable reason (handler errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Event payload (set only for `EventPublished`).
    pub content: Option<Value>,
}

impl Notice {
    /// Creates a new notice of the given kind with current timestamp and
    /// next sequence number.
    pub fn now(kind: NoticeKind) -> Self {
        Self {
            seq: NOTICE_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            topic: None,
            subscriber: None,
            event_id: None,
            attempt: None,
            delay_ms: None,
            timeout_ms: None,
            reason: None,
            content: None,
        }
    }

    /// Attaches a topic.
    #[inline]
    pub fn with_topic(mut self, topic: Topic) -> Self {
        self.topic = Some(topic);
        self
    }

    /// Attaches a subscriber domain.
    #[inline]
    pub fn with_subscriber(mut self, subscriber: Domain) -> Self {
        self.subscriber = Some(subscriber);
        self
    }

    /// Attaches an event id.
    #[inline]
    pub fn with_event_id(mut self, event_id: impl Into<Arc<str>>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a redelivery delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an event payload (publish notices only).
    #[inline]
    pub fn with_content(mut self, content: Value) -> Self {
        self.content = Some(content);
        self
    }

    /// Creates an observer overflow notice.
    #[inline]
    pub fn observer_overflow(observer: &'static str, reason: &'static str) -> Self {
        Notice::now(NoticeKind::ObserverOverflow)
            .with_reason(format!("observer={observer} reason={reason}"))
    }

    /// Creates an observer panic notice.
    #[inline]
    pub fn observer_panicked(observer: &'static str, info: String) -> Self {
        Notice::now(NoticeKind::ObserverPanicked)
            .with_reason(format!("observer={observer} panic={info}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Notice::now(NoticeKind::EventPublished);
        let b = Notice::now(NoticeKind::EventPublished);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_builder_methods_set_fields() {
        let n = Notice::now(NoticeKind::DeliveryFailed)
            .with_subscriber(Domain::from("PAYMENT"))
            .with_topic(Topic::from("ORDER_CREATED"))
            .with_event_id("e-1")
            .with_attempt(3)
            .with_delay(Duration::from_secs(5))
            .with_reason("boom");

        assert_eq!(n.kind, NoticeKind::DeliveryFailed);
        assert_eq!(n.subscriber.as_ref().unwrap().as_str(), "PAYMENT");
        assert_eq!(n.topic.as_ref().unwrap().as_str(), "ORDER_CREATED");
        assert_eq!(n.event_id.as_deref(), Some("e-1"));
        assert_eq!(n.attempt, Some(3));
        assert_eq!(n.delay_ms, Some(5000));
        assert_eq!(n.reason.as_deref(), Some("boom"));
    }
}
