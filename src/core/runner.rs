//! # Run a single delivery attempt.
//!
//! Executes one attempt of a [`Handler`] against one event, with an optional
//! per-attempt timeout, publishing attempt notices to the [`Bus`].
//!
//! ## Notice flow
//! ```text
//! Success:
//!   handler.handle() → Ok(())        → (actor acknowledges, then publishes
//!                                       DeliverySucceeded)
//! Failure:
//!   handler.handle() → Err(Fail)     → publish DeliveryFailed
//!
//! Timeout:
//!   deadline elapsed                 → publish DeliveryTimedOut
//!                                    → publish DeliveryFailed (timeout)
//!                                    → return Timeout error
//! ```
//!
//! ## Rules
//! - At most one `DeliveryFailed` per attempt; `DeliveryTimedOut` is
//!   published **in addition to** it on timeout.
//! - `DeliverySucceeded` is the actor's to publish, after the acknowledgment
//!   has actually been persisted.
//! - The handler future is dropped on timeout; the attempt counter already
//!   recorded the attempt, so a partially run handler is indistinguishable
//!   from a failed one (at-least-once semantics).

use std::time::Duration;

use serde_json::Value;
use tokio::time;

use crate::error::HandlerError;
use crate::events::{Bus, Domain, Notice, NoticeKind, Topic};
use crate::handlers::Handler;

/// Executes a single attempt of `handler` against one event.
///
/// `attempt` is the already-incremented tries count for this attempt.
/// Failure notices carry subscriber, topic, event id, attempt, and reason so
/// operators can reconstruct every failed attempt post-hoc.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn attempt_once(
    handler: &dyn Handler,
    subscriber: &Domain,
    topic: &Topic,
    event_id: &str,
    content: &Value,
    timeout: Option<Duration>,
    attempt: u32,
    bus: &Bus,
) -> Result<(), HandlerError> {
    let res = if let Some(dur) = timeout.filter(|d| *d > Duration::ZERO) {
        match time::timeout(dur, handler.handle(event_id, content)).await {
            Ok(r) => r,
            Err(_elapsed) => {
                bus.publish(
                    Notice::now(NoticeKind::DeliveryTimedOut)
                        .with_subscriber(subscriber.clone())
                        .with_topic(topic.clone())
                        .with_event_id(event_id)
                        .with_attempt(attempt)
                        .with_timeout(dur),
                );
                Err(HandlerError::Timeout { timeout: dur })
            }
        }
    } else {
        handler.handle(event_id, content).await
    };

    if let Err(ref e) = res {
        bus.publish(
            Notice::now(NoticeKind::DeliveryFailed)
                .with_subscriber(subscriber.clone())
                .with_topic(topic.clone())
                .with_event_id(event_id)
                .with_attempt(attempt)
                .with_reason(e.as_message()),
        );
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::HandlerFn;
    use serde_json::json;

    fn ids() -> (Domain, Topic) {
        (Domain::from("PAYMENT"), Topic::from("ORDER_CREATED"))
    }

    #[tokio::test]
    async fn test_success_publishes_no_failure_notice() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let (sub, topic) = ids();
        let handler = HandlerFn::new("ok", |_id: String, _c: Value| async { Ok(()) });

        let res = attempt_once(&handler, &sub, &topic, "e-1", &json!({}), None, 1, &bus).await;
        assert!(res.is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failure_publishes_delivery_failed() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let (sub, topic) = ids();
        let handler = HandlerFn::new("bad", |_id: String, _c: Value| async {
            Err(HandlerError::fail("card declined"))
        });

        let res = attempt_once(&handler, &sub, &topic, "e-1", &json!({}), None, 2, &bus).await;
        assert!(res.is_err());

        let n = rx.try_recv().unwrap();
        assert_eq!(n.kind, NoticeKind::DeliveryFailed);
        assert_eq!(n.attempt, Some(2));
        assert_eq!(n.reason.as_deref(), Some("error: card declined"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failed_attempt() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let (sub, topic) = ids();
        let handler = HandlerFn::new("slow", |_id: String, _c: Value| async {
            time::sleep(Duration::from_secs(60)).await;
            Ok(())
        });

        let res = attempt_once(
            &handler,
            &sub,
            &topic,
            "e-1",
            &json!({}),
            Some(Duration::from_secs(5)),
            1,
            &bus,
        )
        .await;
        assert!(matches!(res, Err(HandlerError::Timeout { .. })));

        let first = rx.try_recv().unwrap();
        assert_eq!(first.kind, NoticeKind::DeliveryTimedOut);
        assert_eq!(first.timeout_ms, Some(5000));
        let second = rx.try_recv().unwrap();
        assert_eq!(second.kind, NoticeKind::DeliveryFailed);
    }
}
