//! # Persisted document shapes.
//!
//! Three document families cross the storage boundary:
//!
//! | Name                        | Shape            | Discipline   |
//! |-----------------------------|------------------|--------------|
//! | `events-<topic>`            | [`EventLogDoc`]  | append-only  |
//! | `queue-<subscriber>-<topic>`| [`QueueDoc`]     | two disjoint sets |
//! | `dead-letter-queue`         | [`DeadLetterDoc`]| append-only  |
//!
//! A `QueueDoc` holds an event id in at most one of `processing_events` /
//! `processed_events` at any time. The dead-letter document is read by
//! operators for manual remediation; the broker never consumes it back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::events::{Domain, Topic};

/// Document name for a topic's event log.
pub(crate) fn event_log_name(topic: &Topic) -> String {
    format!("events-{topic}")
}

/// Document name for a subscription's queue.
pub(crate) fn queue_name(subscriber: &Domain, topic: &Topic) -> String {
    format!("queue-{subscriber}-{topic}")
}

/// Document name for the shared dead-letter record.
pub(crate) const DEAD_LETTER_NAME: &str = "dead-letter-queue";

/// One event as recorded in a topic's log.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggedEvent {
    /// Id of the event or request that caused this one.
    pub parent_id: String,
    /// Unique event id within the topic's log.
    pub event_id: String,
    /// Arbitrary JSON payload.
    pub content: Value,
}

/// Per-topic durable record of every published event. Append-only; never
/// mutated or truncated.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventLogDoc {
    /// The topic this log belongs to.
    pub topic: Topic,
    /// All events ever published to the topic, in publish order.
    pub events: Vec<LoggedEvent>,
}

impl EventLogDoc {
    /// Creates an empty log for a topic.
    pub fn empty(topic: Topic) -> Self {
        Self {
            topic,
            events: Vec::new(),
        }
    }
}

/// An event accepted for delivery but not yet acknowledged.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProcessingEntry {
    /// The pending event's id.
    pub event_id: String,
    /// The pending event's payload.
    pub content: Value,
    /// Attempts started so far (incremented before each attempt runs).
    pub tries: u32,
}

/// An event the handler completed successfully.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProcessedEntry {
    /// The completed event's id.
    pub event_id: String,
    /// Attempts it took to complete.
    pub tries: u32,
    /// When the acknowledgment was recorded.
    pub processed_at: DateTime<Utc>,
}

/// Durable state of in-flight and completed work for one (subscriber, topic)
/// pair.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueueDoc {
    /// The owning subscriber domain.
    pub subscriber: Domain,
    /// The subscribed topic.
    pub topic: Topic,
    /// Events accepted for delivery but not yet acknowledged.
    pub processing_events: Vec<ProcessingEntry>,
    /// Events the handler completed successfully.
    pub processed_events: Vec<ProcessedEntry>,
}

impl QueueDoc {
    /// Creates an empty queue for a subscription.
    pub fn empty(subscriber: Domain, topic: Topic) -> Self {
        Self {
            subscriber,
            topic,
            processing_events: Vec::new(),
            processed_events: Vec::new(),
        }
    }

    /// Returns the index of a pending entry by event id, if present.
    pub(crate) fn processing_index(&self, event_id: &str) -> Option<usize> {
        self.processing_events
            .iter()
            .position(|e| e.event_id == event_id)
    }
}

/// One event a subscription abandoned after exhausting its retry budget.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    /// The abandoned event's id.
    pub event_id: String,
    /// Topic the event was published under.
    pub topic: Topic,
    /// The subscriber that gave up on it.
    pub subscriber: Domain,
    /// Attempts started before giving up.
    pub tries: u32,
}

/// Append-only record of dead-lettered events across all subscriptions.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DeadLetterDoc {
    /// All dead-lettered events, in escalation order.
    pub entries: Vec<DeadLetterEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_names() {
        let topic = Topic::from("ORDER_CREATED");
        let sub = Domain::from("PAYMENT");
        assert_eq!(event_log_name(&topic), "events-ORDER_CREATED");
        assert_eq!(queue_name(&sub, &topic), "queue-PAYMENT-ORDER_CREATED");
    }

    #[test]
    fn test_queue_doc_roundtrip() {
        let mut doc = QueueDoc::empty(Domain::from("PAYMENT"), Topic::from("ORDER_CREATED"));
        doc.processing_events.push(ProcessingEntry {
            event_id: "e-1".into(),
            content: json!({"x": 1}),
            tries: 2,
        });
        doc.processed_events.push(ProcessedEntry {
            event_id: "e-0".into(),
            tries: 1,
            processed_at: Utc::now(),
        });

        let bytes = serde_json::to_vec(&doc).unwrap();
        let back: QueueDoc = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back.processing_events.len(), 1);
        assert_eq!(back.processing_events[0].tries, 2);
        assert_eq!(back.processed_events[0].event_id, "e-0");
        assert_eq!(back.processing_index("e-1"), Some(0));
        assert_eq!(back.processing_index("e-0"), None);
    }
}
