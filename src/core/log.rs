//! # Per-topic durable event log.
//!
//! [`EventLog`] keeps one append-only document per topic (`events-<topic>`)
//! through the storage boundary. The log is read-modify-written wholesale on
//! each append, so appends to the same topic are linearized behind a
//! per-topic lock; concurrent publishers to different topics do not contend.
//!
//! `load_all` is used only at subscription-establishment time to backfill a
//! brand-new subscriber queue with the topic's full history.

use serde_json::Value;
use tracing::debug;

use crate::error::BrokerError;
use crate::events::{Event, Topic};
use crate::storage::{self, EventLogDoc, LoggedEvent, StorageRef};

use super::locks::KeyedLocks;

/// Append-only, per-topic record of every published event.
pub(crate) struct EventLog {
    store: StorageRef,
    locks: KeyedLocks,
}

impl EventLog {
    pub(crate) fn new(store: StorageRef) -> Self {
        Self {
            store,
            locks: KeyedLocks::new(),
        }
    }

    /// Mints a fresh event, appends it to the topic's log, and persists the
    /// log. Persistence errors propagate to the publishing caller; nothing
    /// fails silently here.
    pub(crate) async fn append(
        &self,
        topic: &Topic,
        parent_id: &str,
        content: Value,
    ) -> Result<Event, BrokerError> {
        let name = storage::event_log_name(topic);
        let _guard = self.locks.acquire(&name).await;

        let mut doc = match storage::load_doc::<EventLogDoc>(self.store.as_ref(), &name).await {
            Ok(doc) => doc,
            Err(e) if e.is_not_found() => EventLogDoc::empty(topic.clone()),
            Err(e) => return Err(e.into()),
        };

        let event = Event::mint(parent_id, topic.clone(), content);
        doc.events.push(LoggedEvent {
            parent_id: event.parent_id.clone(),
            event_id: event.event_id.clone(),
            content: event.content.clone(),
        });
        storage::save_doc(self.store.as_ref(), &name, &doc).await?;

        debug!(topic = %topic, event_id = %event.event_id, total = doc.events.len(), "event appended");
        Ok(event)
    }

    /// Loads the full history of a topic, oldest first. Returns an empty
    /// sequence for a topic that has never been published to.
    pub(crate) async fn load_all(&self, topic: &Topic) -> Result<Vec<LoggedEvent>, BrokerError> {
        let name = storage::event_log_name(topic);
        match storage::load_doc::<EventLogDoc>(self.store.as_ref(), &name).await {
            Ok(doc) => Ok(doc.events),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}
