//! # durabus
//!
//! **durabus** is an in-process, file-persisted publish/subscribe event
//! broker for Rust.
//!
//! It gives several logical services sharing one process a decoupled,
//! durable, replayable event flow — topic-based messaging with
//! at-least-once delivery, fixed-delay redelivery, bounded retries with
//! dead-letter escalation, and per-subscriber progress that survives
//! restarts — without an external broker.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!            publish(parent_id, topic, content)
//!                          │
//!                          ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Broker (publish coordinator)                                     │
//! │  1. EventLog::append            (durable, per-topic, append-only) │
//! │  2. QueueManager::enqueue       (one write per bound subscriber)  │
//! │  3. Bus::publish(EventPublished)                                  │
//! └──────┬──────────────────────┬──────────────────────────┬──────────┘
//!        ▼                      ▼                          ▼
//! ┌──────────────┐      ┌──────────────┐          ┌────────────────┐
//! │DeliveryActor │      │DeliveryActor │          │notice_listener │
//! │(PAYMENT, T)  │      │(INVENTORY, T)│          │                │
//! │ retry loop   │      │ retry loop   │          │  ObserverSet   │
//! │ per event    │      │ per event    │          │ (log, metrics) │
//! └──────┬───────┘      └──────┬───────┘          └────────────────┘
//!        ▼                     ▼
//!   QueueManager          QueueManager
//!   increment_tries /     increment_tries /
//!   acknowledge /         acknowledge /
//!   dead_letter           dead_letter
//! ```
//!
//! ### Per-event delivery lifecycle
//! ```text
//! Pending ──► Attempting ──► Acknowledged          (terminal success)
//!                │
//!                ├─────────► Retrying ── sleep(redeliver_delay) ──► Attempting
//!                │               │
//!                │               └──► DeadLettered (terminal failure,
//!                │                    persisted to dead-letter-queue)
//!
//! - tries is incremented BEFORE the handler runs (counts attempts started)
//! - attempt #1 is immediate; attempts #2..max_attempts each wait the delay
//! - the handler is raced against handler_timeout; elapsing is a failure
//! - events of one subscription retry concurrently and independently
//! ```
//!
//! ## Delivery guarantees
//! - **At-least-once**: an event is redelivered until acknowledged or
//!   dead-lettered; handlers must be idempotent-safe.
//! - **No loss on restart**: publish durably appends to the event log before
//!   any notification; a subscriber that (re)initializes backfills from the
//!   log or resumes its persisted queue exactly where it left off.
//! - **Fan-out independence**: each subscriber of a topic has its own
//!   durable queue; one subscriber's failures never affect another's.
//! - **No ordering guarantee within a queue**: retry delays mean a later
//!   event can be acknowledged before an earlier one still mid-retry.
//!
//! ## Features
//! | Area            | Description                                          | Key types / traits                     |
//! |-----------------|------------------------------------------------------|----------------------------------------|
//! | **Broker API**  | Register subscribers, subscribe handlers, publish.   | [`Broker`], [`SubscriberHandle`]       |
//! | **Handlers**    | Business-logic callbacks, easy to compose.           | [`Handler`], [`HandlerFn`], [`HandlerRef`] |
//! | **Storage**     | Named JSON documents; file-backed or in-memory.      | [`Storage`], [`JsonFileStore`], [`MemoryStore`] |
//! | **Observers**   | Hook into broker notices (logging, metrics).         | [`Observe`], [`LogObserver`]           |
//! | **Policies**    | Bounded fixed-delay retry.                           | [`RetryPolicy`]                        |
//! | **Errors**      | Typed errors for broker and handlers.                | [`BrokerError`], [`HandlerError`]      |
//! | **Configuration** | Centralized runtime settings.                      | [`BrokerConfig`]                       |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use serde_json::{json, Value};
//! use durabus::{Broker, BrokerConfig, HandlerError, HandlerFn, MemoryStore};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let broker = Broker::builder(BrokerConfig::default())
//!         .with_storage(Arc::new(MemoryStore::new()))
//!         .build();
//!
//!     // One subscriber per domain; a domain may subscribe to many topics.
//!     let payment = broker.register_subscriber("PAYMENT".into()).await?;
//!     payment
//!         .subscribe(
//!             "ORDER_CREATED".into(),
//!             HandlerFn::arc("charge-card", |event_id: String, content: Value| async move {
//!                 if content["amount"].is_null() {
//!                     return Err(HandlerError::fail("missing amount"));
//!                 }
//!                 println!("charging for {event_id}");
//!                 Ok(())
//!             }),
//!         )
//!         .await?;
//!
//!     // Root events use a self-referential parent id.
//!     broker
//!         .publish("req-1", "ORDER_CREATED".into(), json!({"amount": 99}))
//!         .await?;
//!
//!     broker.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
mod handlers;
mod observers;
mod policies;
mod storage;

// ---- Public re-exports ----

pub use config::BrokerConfig;
pub use core::{Broker, BrokerBuilder, SubscriberHandle};
pub use error::{BrokerError, HandlerError};
pub use events::{Bus, Domain, Event, Notice, NoticeKind, Topic};
pub use handlers::{Handler, HandlerFn, HandlerRef};
pub use observers::{LogObserver, Observe, ObserverSet};
pub use policies::RetryPolicy;
pub use storage::{
    DeadLetterDoc, DeadLetterEntry, EventLogDoc, JsonFileStore, LoggedEvent, MemoryStore,
    ProcessedEntry, ProcessingEntry, QueueDoc, Storage, StorageError, StorageRef,
};
