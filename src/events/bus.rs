//! # Notice bus for broadcasting broker notices.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking notice publishing from multiple sources (delivery actors,
//! the publish coordinator, observer workers).
//!
//! ## Architecture
//! ```text
//! Publishers (many):                  Receivers (many):
//!   Broker   ──┐                   ┌──► DeliveryActor (PAYMENT, ORDER_CREATED)
//!   Actor 1  ──┼──────► Bus ───────┼──► DeliveryActor (INVENTORY, ORDER_CREATED)
//!   Actor N  ──┘  (broadcast chan) └──► notice_listener ──► ObserverSet
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks; it calls
//!   `broadcast::Sender::send`.
//! - **Bounded capacity**: a single ring buffer stores recent notices for all
//!   receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n`
//!   oldest items. Delivery actors recover missed `EventPublished` notices by
//!   re-scanning their durable queue, so lag delays delivery but never loses
//!   an event — durability lives in storage, not in this channel.

use tokio::sync::broadcast;

use super::notice::Notice;

/// Broadcast channel for broker notices.
///
/// Thin wrapper over [`tokio::sync::broadcast`] that provides a
/// `publish`/`subscribe` API. Multiple publishers can publish concurrently;
/// receivers get clones of each notice.
///
/// ### Properties
/// - **Non-blocking**: `publish()` returns immediately.
/// - **Fire-and-forget**: no delivery or durability guarantees at this layer.
/// - **Cloneable**: cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Notice>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity.
    ///
    /// Capacity is shared across all receivers; the minimum is 1 (clamped).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Notice>(capacity);
        Self { tx }
    }

    /// Publishes a notice to all active receivers.
    ///
    /// If there are no receivers, the notice is dropped (this function still
    /// returns immediately). Listener failures never propagate back here.
    pub fn publish(&self, notice: Notice) {
        let _ = self.tx.send(notice);
    }

    /// Creates a new receiver that will observe subsequent notices.
    ///
    /// - Each call creates an **independent** receiver.
    /// - A receiver only gets notices **sent after** it subscribes.
    /// - Slow receivers get `RecvError::Lagged(n)` and skip missed items.
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NoticeKind;

    #[tokio::test]
    async fn test_receiver_sees_notices_published_after_subscribe() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();

        bus.publish(Notice::now(NoticeKind::ShutdownRequested));
        let got = rx.recv().await.unwrap();
        assert_eq!(got.kind, NoticeKind::ShutdownRequested);
    }

    #[tokio::test]
    async fn test_publish_without_receivers_does_not_block() {
        let bus = Bus::new(1);
        bus.publish(Notice::now(NoticeKind::ShutdownRequested));
        bus.publish(Notice::now(NoticeKind::ShutdownRequested));
    }
}
