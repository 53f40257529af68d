//! # ObserverSet: non-blocking fan-out over multiple observers.
//!
//! [`ObserverSet`] distributes each [`Notice`](crate::events::Notice) to
//! multiple observers **without awaiting** their processing.
//!
//! ## What it guarantees
//! - `emit(&Notice)` returns immediately.
//! - Per-observer FIFO (queue order).
//! - Panics inside observers are caught and reported (isolation).
//!
//! ## What it does **not** guarantee
//! - No global ordering across different observers.
//! - No retries on per-observer queue overflow (notices are dropped for that
//!   observer).
//!
//! ## Diagram
//! ```text
//!    emit(&Notice)
//!        │                        (Arc-clone per observer)
//!        ├────────────────► [queue O1] ─► worker O1 ─► on_notice()
//!        ├────────────────► [queue O2] ─► worker O2 ─► on_notice()
//!        └────────────────► [queue ON] ─► worker ON ─► on_notice()
//! ```

use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::events::{Bus, Notice};

use super::Observe;

/// Per-observer channel with metadata.
struct ObserverChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Notice>>,
}

/// Composite fan-out with per-observer bounded queues and worker tasks.
pub struct ObserverSet {
    channels: Vec<ObserverChannel>,
    workers: Vec<JoinHandle<()>>,
}

impl ObserverSet {
    /// Creates a new set and spawns one worker per observer.
    ///
    /// `bus` is used to report observer panics without coupling workers to
    /// any particular logging backend.
    #[must_use]
    pub fn new(observers: Vec<Arc<dyn Observe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(observers.len());
        let mut workers = Vec::with_capacity(observers.len());

        for obs in observers {
            let cap = obs.queue_capacity().max(1);
            let name = obs.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Notice>>(cap);
            let worker_bus = bus.clone();

            let handle = tokio::spawn(async move {
                while let Some(notice) = rx.recv().await {
                    let fut = obs.on_notice(notice.as_ref());
                    if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        worker_bus
                            .publish(Notice::observer_panicked(obs.name(), format!("{panic_err:?}")));
                    }
                }
            });

            channels.push(ObserverChannel { name, sender: tx });
            workers.push(handle);
        }

        Self { channels, workers }
    }

    /// Fan-out one notice to all observers (non-blocking).
    ///
    /// If an observer's queue is full or closed, the notice is dropped for it
    /// and an `ObserverOverflow` notice is published on `bus`. Overflow
    /// reports for observer notices themselves are not re-reported.
    pub fn emit(&self, notice: &Notice, bus: &Bus) {
        let shared = Arc::new(notice.clone());
        for channel in &self.channels {
            match channel.sender.try_send(Arc::clone(&shared)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    if !is_observer_report(notice) {
                        bus.publish(Notice::observer_overflow(channel.name, "full"));
                    }
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    if !is_observer_report(notice) {
                        bus.publish(Notice::observer_overflow(channel.name, "closed"));
                    }
                }
            }
        }
    }

    /// Graceful shutdown: close all queues and await worker completion.
    pub async fn shutdown(self) {
        drop(self.channels);
        for h in self.workers {
            let _ = h.await;
        }
    }

    /// True if there are no observers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Number of observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }
}

fn is_observer_report(notice: &Notice) -> bool {
    matches!(
        notice.kind,
        crate::events::NoticeKind::ObserverOverflow | crate::events::NoticeKind::ObserverPanicked
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NoticeKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter {
        seen: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Observe for Counter {
        async fn on_notice(&self, _notice: &Notice) {
            self.seen.fetch_add(1, Ordering::SeqCst);
        }

        fn name(&self) -> &'static str {
            "counter"
        }
    }

    #[tokio::test]
    async fn test_emit_reaches_every_observer() {
        let bus = Bus::new(16);
        let seen_a = Arc::new(AtomicUsize::new(0));
        let seen_b = Arc::new(AtomicUsize::new(0));
        let set = ObserverSet::new(
            vec![
                Arc::new(Counter {
                    seen: Arc::clone(&seen_a),
                }),
                Arc::new(Counter {
                    seen: Arc::clone(&seen_b),
                }),
            ],
            bus.clone(),
        );
        assert_eq!(set.len(), 2);

        set.emit(&Notice::now(NoticeKind::ShutdownRequested), &bus);
        set.shutdown().await;

        assert_eq!(seen_a.load(Ordering::SeqCst), 1);
        assert_eq!(seen_b.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_set_is_harmless() {
        let bus = Bus::new(16);
        let set = ObserverSet::new(Vec::new(), bus.clone());
        assert!(set.is_empty());
        set.emit(&Notice::now(NoticeKind::ShutdownRequested), &bus);
    }
}
