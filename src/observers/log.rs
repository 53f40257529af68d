//! # Structured-logging observer.
//!
//! [`LogObserver`] renders every notice through [`tracing`], one line per
//! notice with the broker's stable field names. Useful out of the box for
//! development and as a reference for custom observers.
//!
//! ## Output (with a fmt subscriber installed)
//! ```text
//! INFO durabus: event published topic=ORDER_CREATED event_id=4f1c...
//! INFO durabus: delivery started subscriber=PAYMENT topic=ORDER_CREATED attempt=1
//! WARN durabus: delivery failed subscriber=PAYMENT ... reason="card declined"
//! WARN durabus: redelivery scheduled subscriber=PAYMENT ... delay_ms=5000
//! ERROR durabus: dead-lettered subscriber=PAYMENT topic=ORDER_CREATED event_id=4f1c...
//! ```

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::events::{Notice, NoticeKind};

use super::Observe;

/// Observer that logs every notice via `tracing`.
#[derive(Debug, Default)]
pub struct LogObserver;

impl LogObserver {
    /// Creates a new logging observer.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Observe for LogObserver {
    async fn on_notice(&self, n: &Notice) {
        let topic = n.topic.as_ref().map(|t| t.as_str()).unwrap_or("-");
        let subscriber = n.subscriber.as_ref().map(|d| d.as_str()).unwrap_or("-");
        let event_id = n.event_id.as_deref().unwrap_or("-");

        match n.kind {
            NoticeKind::EventPublished => {
                info!(seq = n.seq, topic, event_id, "event published");
            }
            NoticeKind::DeliveryStarted => {
                info!(seq = n.seq, subscriber, topic, event_id, attempt = n.attempt, "delivery started");
            }
            NoticeKind::DeliverySucceeded => {
                info!(seq = n.seq, subscriber, topic, event_id, attempt = n.attempt, "delivery succeeded");
            }
            NoticeKind::DeliveryFailed => {
                warn!(
                    seq = n.seq,
                    subscriber,
                    topic,
                    event_id,
                    attempt = n.attempt,
                    reason = n.reason.as_deref(),
                    "delivery failed"
                );
            }
            NoticeKind::DeliveryTimedOut => {
                warn!(
                    seq = n.seq,
                    subscriber,
                    topic,
                    event_id,
                    attempt = n.attempt,
                    timeout_ms = n.timeout_ms,
                    "delivery timed out"
                );
            }
            NoticeKind::RedeliveryScheduled => {
                warn!(
                    seq = n.seq,
                    subscriber,
                    topic,
                    event_id,
                    attempt = n.attempt,
                    delay_ms = n.delay_ms,
                    "redelivery scheduled"
                );
            }
            NoticeKind::DeadLettered => {
                error!(seq = n.seq, subscriber, topic, event_id, attempt = n.attempt, "dead-lettered");
            }
            NoticeKind::SubscriberRegistered => {
                info!(seq = n.seq, subscriber, "subscriber registered");
            }
            NoticeKind::SubscriptionEstablished => {
                info!(seq = n.seq, subscriber, topic, "subscription established");
            }
            NoticeKind::ObserverOverflow => {
                warn!(seq = n.seq, reason = n.reason.as_deref(), "observer overflow");
            }
            NoticeKind::ObserverPanicked => {
                error!(seq = n.seq, reason = n.reason.as_deref(), "observer panicked");
            }
            NoticeKind::ShutdownRequested => {
                info!(seq = n.seq, "shutdown requested");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
