//! # Broker: publish coordination, subscriptions, and graceful shutdown.
//!
//! The [`Broker`] owns the notice bus, the storage-backed event log and
//! queue manager, the subscription [`Registry`], and the observer listener.
//! It is the embedding application's whole surface: register a subscriber
//! for a domain, subscribe (topic, handler) pairs, publish events.
//!
//! ## High-level architecture
//! ```text
//! publish(parent_id, topic, content)
//!   1. EventLog::append          (durable first — crash here loses nothing)
//!   2. QueueManager::enqueue     (one write per subscriber of the topic)
//!   3. Bus::publish(EventPublished)
//!                                      ┌─────────────┬──────────────┐
//!                                      ▼             ▼              ▼
//!                             DeliveryActor   DeliveryActor   notice_listener
//!                             (PAYMENT, T)    (INVENTORY, T)        │
//!                                                            ObserverSet::emit
//! ```
//!
//! A crash between steps 1 and 2-3 loses only the in-memory notification:
//! the event stays in the log, and a subscriber that re-initializes discovers
//! it via backfill.
//!
//! ## Example
//! ```rust
//! use durabus::{Broker, BrokerConfig, HandlerFn, MemoryStore};
//! use serde_json::{json, Value};
//! use std::sync::Arc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let broker = Broker::builder(BrokerConfig::default())
//!         .with_storage(Arc::new(MemoryStore::new()))
//!         .build();
//!
//!     let payment = broker.register_subscriber("PAYMENT".into()).await?;
//!     payment
//!         .subscribe(
//!             "ORDER_CREATED".into(),
//!             HandlerFn::arc("charge", |_id: String, content: Value| async move {
//!                 println!("charging for {content}");
//!                 Ok(())
//!             }),
//!         )
//!         .await?;
//!
//!     let event_id = broker
//!         .publish("req-42", "ORDER_CREATED".into(), json!({"amount": 99}))
//!         .await?;
//!     println!("published {event_id}");
//!
//!     broker.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::BrokerConfig;
use crate::error::BrokerError;
use crate::events::{Bus, Domain, Notice, NoticeKind, Topic};
use crate::handlers::HandlerRef;
use crate::policies::RetryPolicy;
use crate::storage::{DeadLetterDoc, QueueDoc};

use super::actor::DeliveryActor;
use super::log::EventLog;
use super::queue::QueueManager;
use super::registry::{ActorHandle, Registry};

/// In-process, file-persisted publish/subscribe broker.
///
/// Construct via [`Broker::builder`]. The broker is shared as an
/// `Arc<Broker>`; all methods take `&self`.
pub struct Broker {
    pub(crate) cfg: BrokerConfig,
    pub(crate) bus: Bus,
    pub(crate) log: EventLog,
    pub(crate) queues: Arc<QueueManager>,
    pub(crate) registry: Registry,
    pub(crate) runtime_token: CancellationToken,
    pub(crate) observer_listener: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Broker {
    /// Starts building a broker with the given configuration.
    pub fn builder(cfg: BrokerConfig) -> super::builder::BrokerBuilder {
        super::builder::BrokerBuilder::new(cfg)
    }

    /// Registers a subscriber for a domain.
    ///
    /// Fails with [`BrokerError::DuplicateSubscriber`] if the domain already
    /// registered in this process lifetime. The returned handle is the only
    /// way to establish subscriptions for the domain.
    pub async fn register_subscriber(
        self: &Arc<Self>,
        domain: Domain,
    ) -> Result<SubscriberHandle, BrokerError> {
        self.registry.register(&domain).await?;
        self.bus.publish(
            Notice::now(NoticeKind::SubscriberRegistered).with_subscriber(domain.clone()),
        );
        info!(subscriber = %domain, "subscriber registered");
        Ok(SubscriberHandle {
            domain,
            broker: Arc::clone(self),
        })
    }

    /// Publishes an event: durably appends it to the topic's log, fans it
    /// out to every subscribed queue, then notifies live delivery actors.
    ///
    /// Returns the minted event id. Log-append and fan-out failures
    /// propagate to the caller; delivery outcomes never do — publishing is
    /// fire-and-forget with respect to downstream processing.
    pub async fn publish(
        &self,
        parent_id: &str,
        topic: Topic,
        content: Value,
    ) -> Result<String, BrokerError> {
        let event = self.log.append(&topic, parent_id, content).await?;

        for subscriber in self.registry.subscribers_of(&topic).await {
            self.queues.enqueue(&subscriber, &topic, &event).await?;
        }

        self.bus.publish(
            Notice::now(NoticeKind::EventPublished)
                .with_topic(topic)
                .with_event_id(event.event_id.as_str())
                .with_content(event.content),
        );
        Ok(event.event_id)
    }

    /// Reads the durable queue state of one subscription (operator surface).
    pub async fn queue_snapshot(
        &self,
        subscriber: &Domain,
        topic: &Topic,
    ) -> Result<QueueDoc, BrokerError> {
        self.queues.snapshot(subscriber, topic).await
    }

    /// Reads the dead-letter record (operator surface; empty if nothing has
    /// been escalated).
    pub async fn dead_letters(&self) -> Result<DeadLetterDoc, BrokerError> {
        self.queues.dead_letters().await
    }

    /// Requests shutdown: cancels every delivery actor and waits up to the
    /// configured grace period for in-flight deliveries to reach a safe
    /// point.
    ///
    /// Returns [`BrokerError::GraceExceeded`] if some deliveries were still
    /// running when the grace elapsed (their durable state is intact; they
    /// resume on the next start).
    pub async fn shutdown(&self) -> Result<(), BrokerError> {
        self.bus.publish(Notice::now(NoticeKind::ShutdownRequested));
        self.runtime_token.cancel();

        let handles = self.registry.drain_actors().await;
        for h in &handles {
            h.cancel.cancel();
        }

        let grace = self.cfg.grace;
        let join_all = async {
            for h in handles {
                let _ = h.join.await;
            }
        };
        if tokio::time::timeout(grace, join_all).await.is_err() {
            return Err(BrokerError::GraceExceeded { grace });
        }

        // The listener exits on the runtime token and drains the observer
        // queues before finishing.
        let listener = self
            .observer_listener
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(listener) = listener {
            let _ = listener.await;
        }
        Ok(())
    }
}

/// Capability to establish subscriptions for one registered domain.
///
/// Obtained from [`Broker::register_subscriber`]; cloneable so a service can
/// hand it to its own setup code.
#[derive(Clone)]
pub struct SubscriberHandle {
    domain: Domain,
    broker: Arc<Broker>,
}

impl SubscriberHandle {
    /// Returns the domain this handle subscribes on behalf of.
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Establishes a (domain, topic) subscription with the given handler.
    ///
    /// Fails with [`BrokerError::DuplicateSubscription`] if the pair is
    /// already established. On success the durable queue is initialized
    /// (resumed as-is, or backfilled with the topic's full history) and the
    /// delivery actor is running with the backlog dispatched — events
    /// published before this subscription are delivered, not skipped.
    pub async fn subscribe(&self, topic: Topic, handler: HandlerRef) -> Result<(), BrokerError> {
        let broker = &self.broker;

        // Receiver first, queue document second, binding last. A publisher
        // that sees the binding finds the queue document already persisted,
        // and the notice it emits lands in a receiver that already exists —
        // every enqueued event reaches the actor via the backlog snapshot or
        // a buffered notice.
        let rx = broker.bus.subscribe();
        let doc = broker
            .queues
            .ensure_initialized(&self.domain, &topic, &broker.log)
            .await?;
        broker.registry.bind(&self.domain, &topic).await?;

        let actor = DeliveryActor::new(
            self.domain.clone(),
            topic.clone(),
            handler,
            RetryPolicy::from_config(&broker.cfg),
            broker.cfg.handler_timeout_opt(),
            Arc::clone(&broker.queues),
            broker.bus.clone(),
        );

        let token = broker.runtime_token.child_token();
        let join = tokio::spawn(actor.run(token.clone(), rx, doc.processing_events));
        broker
            .registry
            .insert_actor(ActorHandle {
                cancel: token,
                join,
            })
            .await;

        broker.bus.publish(
            Notice::now(NoticeKind::SubscriptionEstablished)
                .with_subscriber(self.domain.clone())
                .with_topic(topic.clone()),
        );
        info!(subscriber = %self.domain, topic = %topic, "subscription established");
        Ok(())
    }
}
