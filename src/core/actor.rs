//! # DeliveryActor: per-subscription delivery engine.
//!
//! One actor runs per (subscriber, topic) subscription. It drives the
//! retry/acknowledgment state machine for every event its subscription owes
//! a delivery for:
//!
//! ```text
//! Pending ──► Attempting ──► Acknowledged   (terminal success)
//!                │
//!                ├─────────► Retrying ──► [fixed delay] ──► Attempting
//!                │               │
//!                │               └──► DeadLettered        (terminal failure)
//! ```
//!
//! ## Event flow
//! For each attempt of each event:
//! ```text
//! increment_tries → DeliveryStarted → [handler ± timeout]
//!     → Ok  → acknowledge → DeliverySucceeded
//!     → Err → DeliveryFailed (from runner)
//!             ├─ tries < budget → RedeliveryScheduled → sleep → next attempt
//!             └─ tries ≥ budget → dead_letter → DeadLettered
//! ```
//!
//! ## Rules
//! - The actor consumes a bus receiver created **before** its subscription's
//!   binding became visible to publishers, so no published event can fall
//!   between the backlog snapshot and live notices.
//! - Each event runs its state machine in its own spawned task: events of
//!   one subscription retry concurrently and independently.
//! - An in-flight set prevents double-dispatch when a live notice races the
//!   backlog (or a lag re-scan).
//! - Attempt #1 of a freshly enqueued event is immediate; every attempt
//!   after a failure waits the fixed redelivery delay.
//! - Backlog entries found already at the attempt budget (crash between
//!   increment and verdict) are dead-lettered without another attempt.
//! - Cancellation is honored at safe points: before each attempt and during
//!   the redelivery sleep. An in-flight handler is bounded only by its
//!   timeout.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinSet;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::error::BrokerError;
use crate::events::{Bus, Domain, Notice, NoticeKind, Topic};
use crate::handlers::HandlerRef;
use crate::policies::RetryPolicy;
use crate::storage::ProcessingEntry;

use super::queue::QueueManager;
use super::runner::attempt_once;

/// Delivery engine for one subscription.
pub(crate) struct DeliveryActor {
    pub(crate) subscriber: Domain,
    pub(crate) topic: Topic,
    pub(crate) handler: HandlerRef,
    pub(crate) policy: RetryPolicy,
    pub(crate) handler_timeout: Option<Duration>,
    pub(crate) queues: Arc<QueueManager>,
    pub(crate) bus: Bus,
    in_flight: Mutex<HashSet<String>>,
}

impl DeliveryActor {
    pub(crate) fn new(
        subscriber: Domain,
        topic: Topic,
        handler: HandlerRef,
        policy: RetryPolicy,
        handler_timeout: Option<Duration>,
        queues: Arc<QueueManager>,
        bus: Bus,
    ) -> Arc<Self> {
        Arc::new(Self {
            subscriber,
            topic,
            handler,
            policy,
            handler_timeout,
            queues,
            bus,
            in_flight: Mutex::new(HashSet::new()),
        })
    }

    /// Runs the actor until cancellation: dispatches the persisted backlog,
    /// then processes live `EventPublished` notices for its topic.
    ///
    /// `rx` must have been subscribed before the (subscriber, topic) binding
    /// became visible to publishers; its buffer then holds every notice for
    /// an event enqueued after the backlog snapshot. A spawned actor that
    /// subscribed at its first poll instead would miss events published
    /// before it was scheduled.
    ///
    /// On broadcast lag the actor re-scans its durable queue for entries not
    /// already in flight — a dropped notice delays a delivery, never loses
    /// it (the durable enqueue precedes the notice).
    pub(crate) async fn run(
        self: Arc<Self>,
        token: CancellationToken,
        mut rx: broadcast::Receiver<Notice>,
        backlog: Vec<ProcessingEntry>,
    ) {
        let mut deliveries = JoinSet::new();

        for entry in backlog {
            self.dispatch(&mut deliveries, entry.event_id, entry.content, entry.tries, &token);
        }

        loop {
            select! {
                _ = token.cancelled() => break,
                msg = rx.recv() => match msg {
                    Ok(notice) => self.on_notice(notice, &mut deliveries, &token).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            subscriber = %self.subscriber, topic = %self.topic, skipped,
                            "notice bus lagged; re-scanning durable queue"
                        );
                        self.rescan(&mut deliveries, &token).await;
                    }
                    Err(RecvError::Closed) => break,
                },
                Some(_) = deliveries.join_next(), if !deliveries.is_empty() => {}
            }
        }

        // Cancellation propagated to every delivery task; wait for them to
        // reach a safe point and exit.
        while deliveries.join_next().await.is_some() {}
    }

    async fn on_notice(
        self: &Arc<Self>,
        notice: Notice,
        deliveries: &mut JoinSet<()>,
        token: &CancellationToken,
    ) {
        if notice.kind != NoticeKind::EventPublished || notice.topic.as_ref() != Some(&self.topic) {
            return;
        }
        if let (Some(event_id), Some(content)) = (notice.event_id, notice.content) {
            self.dispatch(deliveries, event_id.as_ref().to_owned(), content, 0, token);
        }
    }

    /// Re-reads the durable queue and dispatches any pending entry that is
    /// not already in flight. Used after broadcast lag.
    async fn rescan(self: &Arc<Self>, deliveries: &mut JoinSet<()>, token: &CancellationToken) {
        match self.queues.snapshot(&self.subscriber, &self.topic).await {
            Ok(doc) => {
                for entry in doc.processing_events {
                    self.dispatch(deliveries, entry.event_id, entry.content, entry.tries, token);
                }
            }
            Err(e) => {
                tracing::error!(
                    subscriber = %self.subscriber, topic = %self.topic, error = %e,
                    "queue re-scan failed"
                );
            }
        }
    }

    /// Spawns the per-event state machine unless the event is already in
    /// flight for this subscription.
    fn dispatch(
        self: &Arc<Self>,
        deliveries: &mut JoinSet<()>,
        event_id: String,
        content: Value,
        known_tries: u32,
        token: &CancellationToken,
    ) {
        {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            if !in_flight.insert(event_id.clone()) {
                return;
            }
        }

        let me = Arc::clone(self);
        let token = token.clone();
        deliveries.spawn(async move {
            me.deliver(&event_id, content, known_tries, token).await;
            let mut in_flight = me.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            in_flight.remove(&event_id);
        });
    }

    /// Runs the retry state machine for one event to a terminal state.
    async fn deliver(&self, event_id: &str, content: Value, known_tries: u32, token: CancellationToken) {
        // Resume guard: a crash between increment and verdict can leave an
        // entry already at the budget. No further attempt is owed.
        if self.policy.is_exhausted(known_tries) {
            self.escalate(event_id).await;
            return;
        }

        loop {
            if token.is_cancelled() {
                return;
            }

            let attempt = match self
                .queues
                .increment_tries(&self.subscriber, &self.topic, event_id)
                .await
            {
                Ok(n) => n,
                Err(e) => {
                    self.abort_on_broken_state(event_id, &e);
                    return;
                }
            };

            self.bus.publish(
                Notice::now(NoticeKind::DeliveryStarted)
                    .with_subscriber(self.subscriber.clone())
                    .with_topic(self.topic.clone())
                    .with_event_id(event_id)
                    .with_attempt(attempt),
            );

            let res = attempt_once(
                self.handler.as_ref(),
                &self.subscriber,
                &self.topic,
                event_id,
                &content,
                self.handler_timeout,
                attempt,
                &self.bus,
            )
            .await;

            match res {
                Ok(()) => {
                    match self
                        .queues
                        .acknowledge(&self.subscriber, &self.topic, event_id)
                        .await
                    {
                        Ok(tries) => {
                            self.bus.publish(
                                Notice::now(NoticeKind::DeliverySucceeded)
                                    .with_subscriber(self.subscriber.clone())
                                    .with_topic(self.topic.clone())
                                    .with_event_id(event_id)
                                    .with_attempt(tries),
                            );
                        }
                        Err(e) => self.abort_on_broken_state(event_id, &e),
                    }
                    return;
                }
                Err(_handler_err) => {
                    // DeliveryFailed was already published by the runner.
                    if self.policy.is_exhausted(attempt) {
                        self.escalate(event_id).await;
                        return;
                    }

                    let delay = self.policy.delay;
                    self.bus.publish(
                        Notice::now(NoticeKind::RedeliveryScheduled)
                            .with_subscriber(self.subscriber.clone())
                            .with_topic(self.topic.clone())
                            .with_event_id(event_id)
                            .with_attempt(attempt)
                            .with_delay(delay),
                    );

                    let sleep = time::sleep(delay);
                    tokio::pin!(sleep);
                    select! {
                        _ = &mut sleep => {}
                        _ = token.cancelled() => return,
                    }
                }
            }
        }
    }

    /// Terminal failure: persist the dead-letter record, then announce it.
    async fn escalate(&self, event_id: &str) {
        match self
            .queues
            .dead_letter(&self.subscriber, &self.topic, event_id)
            .await
        {
            Ok(tries) => {
                self.bus.publish(
                    Notice::now(NoticeKind::DeadLettered)
                        .with_subscriber(self.subscriber.clone())
                        .with_topic(self.topic.clone())
                        .with_event_id(event_id)
                        .with_attempt(tries),
                );
            }
            Err(e) => self.abort_on_broken_state(event_id, &e),
        }
    }

    /// Invariant violations and storage failures abort this event's delivery
    /// but are never silently swallowed.
    fn abort_on_broken_state(&self, event_id: &str, e: &BrokerError) {
        if matches!(e, BrokerError::EventNotFound { .. }) {
            // The entry is gone from processing_events: acknowledged or
            // dead-lettered by an earlier incarnation. Nothing left to do.
            tracing::debug!(
                subscriber = %self.subscriber, topic = %self.topic, event_id,
                "event already settled; skipping"
            );
        } else {
            tracing::error!(
                subscriber = %self.subscriber, topic = %self.topic, event_id,
                error = %e, label = e.as_label(),
                "delivery aborted on broken durable state"
            );
        }
    }
}
