//! # Broker construction.
//!
//! [`BrokerBuilder`] wires the runtime components together: notice bus,
//! storage-backed event log and queue manager, registry, and the observer
//! listener that forwards every bus notice to the [`ObserverSet`].

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::BrokerConfig;
use crate::events::Bus;
use crate::observers::{Observe, ObserverSet};
use crate::storage::{MemoryStore, StorageRef};

use super::broker::Broker;
use super::log::EventLog;
use super::queue::QueueManager;
use super::registry::Registry;

/// Builder for constructing a [`Broker`].
pub struct BrokerBuilder {
    cfg: BrokerConfig,
    store: Option<StorageRef>,
    observers: Vec<Arc<dyn Observe>>,
}

impl BrokerBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: BrokerConfig) -> Self {
        Self {
            cfg,
            store: None,
            observers: Vec::new(),
        }
    }

    /// Sets the storage backend the broker persists through.
    ///
    /// Defaults to an in-memory store; production embeddings pass a
    /// [`JsonFileStore`](crate::JsonFileStore) (or their own
    /// [`Storage`](crate::Storage) implementation).
    pub fn with_storage(mut self, store: StorageRef) -> Self {
        self.store = Some(store);
        self
    }

    /// Adds a notice observer (logging, metrics, alerting).
    ///
    /// Observers receive every broker notice through dedicated workers with
    /// bounded queues; they never block the publish or delivery paths.
    pub fn with_observer(mut self, observer: Arc<dyn Observe>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Replaces the whole observer list.
    pub fn with_observers(mut self, observers: Vec<Arc<dyn Observe>>) -> Self {
        self.observers = observers;
        self
    }

    /// Builds the broker and starts the observer listener.
    pub fn build(self) -> Arc<Broker> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as StorageRef);
        let runtime_token = CancellationToken::new();

        let observer_listener = if self.observers.is_empty() {
            None
        } else {
            Some(spawn_observer_listener(
                self.observers,
                bus.clone(),
                runtime_token.clone(),
            ))
        };

        Arc::new(Broker {
            cfg: self.cfg,
            bus,
            log: EventLog::new(Arc::clone(&store)),
            queues: Arc::new(QueueManager::new(store)),
            registry: Registry::new(),
            runtime_token,
            observer_listener: std::sync::Mutex::new(observer_listener),
        })
    }
}

/// Subscribes to the bus and fans every notice out to the observer set.
///
/// The listener owns the set; on cancellation it closes the observer queues
/// and waits for their workers to drain.
fn spawn_observer_listener(
    observers: Vec<Arc<dyn Observe>>,
    bus: Bus,
    token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let mut rx = bus.subscribe();
    let set = ObserverSet::new(observers, bus.clone());

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                msg = rx.recv() => match msg {
                    Ok(notice) => set.emit(&notice, &bus),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        }
        set.shutdown().await;
    })
}
