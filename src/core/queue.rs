//! # Subscriber queue manager.
//!
//! [`QueueManager`] owns every `queue-<subscriber>-<topic>` document and the
//! shared `dead-letter-queue` document. All mutations of one subscription's
//! document go through a per-key lock held across the whole
//! load/mutate/persist cycle, so the publish-path `enqueue` and the
//! delivery-path `increment_tries`/`acknowledge`/`dead_letter` are strictly
//! linearized per (subscriber, topic) key.
//!
//! ## Rules
//! - An event id lives in at most one of `processing_events` /
//!   `processed_events` at any time.
//! - `tries` is incremented **before** the handler runs: it counts attempts
//!   started, not attempts completed.
//! - A missing queue document or a missing processing entry is a broken
//!   invariant (`QueueNotFound` / `EventNotFound`), fatal to that delivery
//!   attempt and logged rather than swallowed.
//! - The dead-letter document is append-only and never consumed back by the
//!   broker.

use chrono::Utc;
use tracing::{debug, info};

use crate::error::BrokerError;
use crate::events::{Domain, Event, Topic};
use crate::storage::{
    self, DeadLetterDoc, DeadLetterEntry, ProcessedEntry, ProcessingEntry, QueueDoc, StorageRef,
};

use super::locks::KeyedLocks;
use super::log::EventLog;

/// Durable per-subscription queue state, linearized per key.
pub(crate) struct QueueManager {
    store: StorageRef,
    locks: KeyedLocks,
    dead_letter_lock: tokio::sync::Mutex<()>,
}

impl QueueManager {
    pub(crate) fn new(store: StorageRef) -> Self {
        Self {
            store,
            locks: KeyedLocks::new(),
            dead_letter_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Ensures the queue document for a subscription exists and returns it.
    ///
    /// If a persisted document already exists it is loaded as-is: a restarted
    /// subscriber resumes exactly where it left off, with previously accrued
    /// `tries` and pending entries intact. If absent, the topic's full event
    /// log is replayed into `processing_events` at `tries = 0` and the new
    /// document is persisted, so a newly added subscriber receives history
    /// rather than only future events.
    pub(crate) async fn ensure_initialized(
        &self,
        subscriber: &Domain,
        topic: &Topic,
        log: &EventLog,
    ) -> Result<QueueDoc, BrokerError> {
        let name = storage::queue_name(subscriber, topic);
        let _guard = self.locks.acquire(&name).await;

        match storage::load_doc::<QueueDoc>(self.store.as_ref(), &name).await {
            Ok(doc) => {
                debug!(
                    subscriber = %subscriber, topic = %topic,
                    pending = doc.processing_events.len(),
                    completed = doc.processed_events.len(),
                    "resuming existing queue"
                );
                Ok(doc)
            }
            Err(e) if e.is_not_found() => {
                let mut doc = QueueDoc::empty(subscriber.clone(), topic.clone());
                for logged in log.load_all(topic).await? {
                    doc.processing_events.push(ProcessingEntry {
                        event_id: logged.event_id,
                        content: logged.content,
                        tries: 0,
                    });
                }
                storage::save_doc(self.store.as_ref(), &name, &doc).await?;
                info!(
                    subscriber = %subscriber, topic = %topic,
                    backfilled = doc.processing_events.len(),
                    "queue initialized from event log"
                );
                Ok(doc)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Appends a fresh `tries = 0` processing entry for a published event.
    ///
    /// Called once per bound subscriber by the publish fan-out step. The
    /// queue document must already exist (subscriptions create it).
    pub(crate) async fn enqueue(
        &self,
        subscriber: &Domain,
        topic: &Topic,
        event: &Event,
    ) -> Result<(), BrokerError> {
        let name = storage::queue_name(subscriber, topic);
        let _guard = self.locks.acquire(&name).await;

        let mut doc = self.load_queue(&name, subscriber, topic).await?;
        doc.processing_events.push(ProcessingEntry {
            event_id: event.event_id.clone(),
            content: event.content.clone(),
            tries: 0,
        });
        storage::save_doc(self.store.as_ref(), &name, &doc).await?;
        Ok(())
    }

    /// Increments the `tries` counter of a pending entry and returns the new
    /// count. Runs before the handler so the counter measures attempts
    /// started.
    pub(crate) async fn increment_tries(
        &self,
        subscriber: &Domain,
        topic: &Topic,
        event_id: &str,
    ) -> Result<u32, BrokerError> {
        let name = storage::queue_name(subscriber, topic);
        let _guard = self.locks.acquire(&name).await;

        let mut doc = self.load_queue(&name, subscriber, topic).await?;
        let idx = doc
            .processing_index(event_id)
            .ok_or_else(|| BrokerError::EventNotFound {
                domain: subscriber.clone(),
                topic: topic.clone(),
                event_id: event_id.to_owned(),
            })?;
        doc.processing_events[idx].tries += 1;
        let tries = doc.processing_events[idx].tries;
        storage::save_doc(self.store.as_ref(), &name, &doc).await?;
        Ok(tries)
    }

    /// Moves a pending entry to `processed_events`, stamping the completion
    /// time. Returns the tries count at completion.
    pub(crate) async fn acknowledge(
        &self,
        subscriber: &Domain,
        topic: &Topic,
        event_id: &str,
    ) -> Result<u32, BrokerError> {
        let name = storage::queue_name(subscriber, topic);
        let _guard = self.locks.acquire(&name).await;

        let mut doc = self.load_queue(&name, subscriber, topic).await?;
        let idx = doc
            .processing_index(event_id)
            .ok_or_else(|| BrokerError::EventNotFound {
                domain: subscriber.clone(),
                topic: topic.clone(),
                event_id: event_id.to_owned(),
            })?;
        let entry = doc.processing_events.remove(idx);
        doc.processed_events.push(ProcessedEntry {
            event_id: entry.event_id,
            tries: entry.tries,
            processed_at: Utc::now(),
        });
        storage::save_doc(self.store.as_ref(), &name, &doc).await?;
        Ok(entry.tries)
    }

    /// Removes a pending entry and appends it to the dead-letter record.
    ///
    /// Returns the tries count recorded in the dead-letter entry. The entry
    /// is gone from `processing_events` afterwards; operators reprocess
    /// dead-letters manually, the broker never re-queues them.
    pub(crate) async fn dead_letter(
        &self,
        subscriber: &Domain,
        topic: &Topic,
        event_id: &str,
    ) -> Result<u32, BrokerError> {
        let name = storage::queue_name(subscriber, topic);
        let tries = {
            let _guard = self.locks.acquire(&name).await;

            let mut doc = self.load_queue(&name, subscriber, topic).await?;
            let idx = doc
                .processing_index(event_id)
                .ok_or_else(|| BrokerError::EventNotFound {
                    domain: subscriber.clone(),
                    topic: topic.clone(),
                    event_id: event_id.to_owned(),
                })?;
            let entry = doc.processing_events.remove(idx);
            storage::save_doc(self.store.as_ref(), &name, &doc).await?;
            entry.tries
        };

        {
            let _guard = self.dead_letter_lock.lock().await;
            let mut dl = match storage::load_doc::<DeadLetterDoc>(
                self.store.as_ref(),
                storage::DEAD_LETTER_NAME,
            )
            .await
            {
                Ok(doc) => doc,
                Err(e) if e.is_not_found() => DeadLetterDoc::default(),
                Err(e) => return Err(e.into()),
            };
            dl.entries.push(DeadLetterEntry {
                event_id: event_id.to_owned(),
                topic: topic.clone(),
                subscriber: subscriber.clone(),
                tries,
            });
            storage::save_doc(self.store.as_ref(), storage::DEAD_LETTER_NAME, &dl).await?;
        }

        info!(subscriber = %subscriber, topic = %topic, event_id, tries, "event dead-lettered");
        Ok(tries)
    }

    /// Reads a subscription's queue document (operator/inspection surface).
    pub(crate) async fn snapshot(
        &self,
        subscriber: &Domain,
        topic: &Topic,
    ) -> Result<QueueDoc, BrokerError> {
        let name = storage::queue_name(subscriber, topic);
        let _guard = self.locks.acquire(&name).await;
        self.load_queue(&name, subscriber, topic).await
    }

    /// Reads the dead-letter record (empty if nothing escalated yet).
    pub(crate) async fn dead_letters(&self) -> Result<DeadLetterDoc, BrokerError> {
        let _guard = self.dead_letter_lock.lock().await;
        match storage::load_doc::<DeadLetterDoc>(self.store.as_ref(), storage::DEAD_LETTER_NAME)
            .await
        {
            Ok(doc) => Ok(doc),
            Err(e) if e.is_not_found() => Ok(DeadLetterDoc::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn load_queue(
        &self,
        name: &str,
        subscriber: &Domain,
        topic: &Topic,
    ) -> Result<QueueDoc, BrokerError> {
        match storage::load_doc::<QueueDoc>(self.store.as_ref(), name).await {
            Ok(doc) => Ok(doc),
            Err(e) if e.is_not_found() => Err(BrokerError::QueueNotFound {
                domain: subscriber.clone(),
                topic: topic.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;
    use std::sync::Arc;

    fn setup() -> (QueueManager, EventLog) {
        let store = MemoryStore::new();
        let store: StorageRef = Arc::new(store);
        (
            QueueManager::new(Arc::clone(&store)),
            EventLog::new(store),
        )
    }

    fn ids() -> (Domain, Topic) {
        (Domain::from("PAYMENT"), Topic::from("ORDER_CREATED"))
    }

    #[tokio::test]
    async fn test_initialization_backfills_from_log() {
        let (queues, log) = setup();
        let (sub, topic) = ids();

        let a = log.append(&topic, "root", json!({"n": 1})).await.unwrap();
        let b = log.append(&topic, "root", json!({"n": 2})).await.unwrap();

        let doc = queues.ensure_initialized(&sub, &topic, &log).await.unwrap();
        assert_eq!(doc.processing_events.len(), 2);
        assert_eq!(doc.processing_events[0].event_id, a.event_id);
        assert_eq!(doc.processing_events[1].event_id, b.event_id);
        assert!(doc.processing_events.iter().all(|e| e.tries == 0));
        assert!(doc.processed_events.is_empty());
    }

    #[tokio::test]
    async fn test_initialization_resumes_existing_state() {
        let (queues, log) = setup();
        let (sub, topic) = ids();

        let ev = log.append(&topic, "root", json!({})).await.unwrap();
        queues.ensure_initialized(&sub, &topic, &log).await.unwrap();
        queues.increment_tries(&sub, &topic, &ev.event_id).await.unwrap();

        // A second init (restart) must preserve accrued tries, not re-seed.
        let doc = queues.ensure_initialized(&sub, &topic, &log).await.unwrap();
        assert_eq!(doc.processing_events.len(), 1);
        assert_eq!(doc.processing_events[0].tries, 1);
    }

    #[tokio::test]
    async fn test_acknowledge_moves_between_sets() {
        let (queues, log) = setup();
        let (sub, topic) = ids();

        let ev = log.append(&topic, "root", json!({})).await.unwrap();
        queues.ensure_initialized(&sub, &topic, &log).await.unwrap();
        queues.increment_tries(&sub, &topic, &ev.event_id).await.unwrap();

        let tries = queues.acknowledge(&sub, &topic, &ev.event_id).await.unwrap();
        assert_eq!(tries, 1);

        let doc = queues.snapshot(&sub, &topic).await.unwrap();
        assert!(doc.processing_events.is_empty());
        assert_eq!(doc.processed_events.len(), 1);
        assert_eq!(doc.processed_events[0].event_id, ev.event_id);
        assert_eq!(doc.processed_events[0].tries, 1);
    }

    #[tokio::test]
    async fn test_acknowledged_event_cannot_be_touched_again() {
        let (queues, log) = setup();
        let (sub, topic) = ids();

        let ev = log.append(&topic, "root", json!({})).await.unwrap();
        queues.ensure_initialized(&sub, &topic, &log).await.unwrap();
        queues.increment_tries(&sub, &topic, &ev.event_id).await.unwrap();
        queues.acknowledge(&sub, &topic, &ev.event_id).await.unwrap();

        let err = queues
            .increment_tries(&sub, &topic, &ev.event_id)
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::EventNotFound { .. }));
    }

    #[tokio::test]
    async fn test_operations_on_missing_queue_fail() {
        let (queues, _log) = setup();
        let (sub, topic) = ids();

        let err = queues
            .increment_tries(&sub, &topic, "e-unknown")
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::QueueNotFound { .. }));
        assert!(err.is_invariant_violation());
    }

    #[tokio::test]
    async fn test_dead_letter_removes_and_records() {
        let (queues, log) = setup();
        let (sub, topic) = ids();

        let ev = log.append(&topic, "root", json!({})).await.unwrap();
        queues.ensure_initialized(&sub, &topic, &log).await.unwrap();
        for _ in 0..5 {
            queues.increment_tries(&sub, &topic, &ev.event_id).await.unwrap();
        }

        let tries = queues.dead_letter(&sub, &topic, &ev.event_id).await.unwrap();
        assert_eq!(tries, 5);

        let doc = queues.snapshot(&sub, &topic).await.unwrap();
        assert!(doc.processing_events.is_empty());
        assert!(doc.processed_events.is_empty());

        let dl = queues.dead_letters().await.unwrap();
        assert_eq!(dl.entries.len(), 1);
        assert_eq!(dl.entries[0].event_id, ev.event_id);
        assert_eq!(dl.entries[0].subscriber, sub);
        assert_eq!(dl.entries[0].tries, 5);
    }

    #[tokio::test]
    async fn test_enqueue_appends_fresh_entry() {
        let (queues, log) = setup();
        let (sub, topic) = ids();

        queues.ensure_initialized(&sub, &topic, &log).await.unwrap();
        let event = Event::mint("root", topic.clone(), json!({"x": 1}));
        queues.enqueue(&sub, &topic, &event).await.unwrap();

        let doc = queues.snapshot(&sub, &topic).await.unwrap();
        assert_eq!(doc.processing_events.len(), 1);
        assert_eq!(doc.processing_events[0].event_id, event.event_id);
        assert_eq!(doc.processing_events[0].tries, 0);
    }
}
