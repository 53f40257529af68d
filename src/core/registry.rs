//! # Subscription registry.
//!
//! Bookkeeping of which domain is bound to which topics and vice versa, plus
//! ownership of the running delivery-actor handles. The tables are explicit
//! state owned by the broker — created with it, torn down at shutdown — not
//! ambient globals.
//!
//! ## Rules
//! - A domain registers at most one subscriber per process lifetime
//!   (`DuplicateSubscriber` otherwise).
//! - A (domain, topic) pair is established at most once
//!   (`DuplicateSubscription` otherwise).
//! - Bindings are recorded bidirectionally so the publish fan-out can look up
//!   a topic's subscribers in O(1).

use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::BrokerError;
use crate::events::{Domain, Topic};

/// Handle to a running delivery actor.
pub(crate) struct ActorHandle {
    /// Individual cancellation token for this subscription's actor.
    pub(crate) cancel: CancellationToken,
    /// Join handle for the actor's main loop.
    pub(crate) join: JoinHandle<()>,
}

#[derive(Default)]
struct Tables {
    /// Registered domains and the topics each is bound to.
    domains: HashMap<Domain, HashSet<Topic>>,
    /// Reverse index: topic to subscribed domains, in subscription order.
    topics: HashMap<Topic, Vec<Domain>>,
    /// Running actors, one per established subscription.
    actors: Vec<ActorHandle>,
}

/// Explicit registry of subscribers, bindings, and actor handles.
pub(crate) struct Registry {
    inner: RwLock<Tables>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            inner: RwLock::new(Tables::default()),
        }
    }

    /// Registers a domain. Fails if it already registered in this process
    /// lifetime.
    pub(crate) async fn register(&self, domain: &Domain) -> Result<(), BrokerError> {
        let mut tables = self.inner.write().await;
        if tables.domains.contains_key(domain) {
            return Err(BrokerError::DuplicateSubscriber {
                domain: domain.clone(),
            });
        }
        tables.domains.insert(domain.clone(), HashSet::new());
        Ok(())
    }

    /// Records a (domain, topic) binding in both directions. Fails if the
    /// pair is already established.
    pub(crate) async fn bind(&self, domain: &Domain, topic: &Topic) -> Result<(), BrokerError> {
        let mut tables = self.inner.write().await;
        // bind is only reachable through a registered handle, but a missing
        // entry is recoverable: treat it as an empty binding set.
        let topics = tables.domains.entry(domain.clone()).or_default();
        if !topics.insert(topic.clone()) {
            return Err(BrokerError::DuplicateSubscription {
                domain: domain.clone(),
                topic: topic.clone(),
            });
        }
        tables
            .topics
            .entry(topic.clone())
            .or_default()
            .push(domain.clone());
        Ok(())
    }

    /// Returns the domains subscribed to a topic, in subscription order.
    /// Empty for a topic nobody subscribed to.
    pub(crate) async fn subscribers_of(&self, topic: &Topic) -> Vec<Domain> {
        let tables = self.inner.read().await;
        tables.topics.get(topic).cloned().unwrap_or_default()
    }

    /// Stores the handle of a freshly spawned delivery actor.
    pub(crate) async fn insert_actor(&self, handle: ActorHandle) {
        let mut tables = self.inner.write().await;
        tables.actors.push(handle);
    }

    /// Takes all actor handles for shutdown: cancel, then join.
    pub(crate) async fn drain_actors(&self) -> Vec<ActorHandle> {
        let mut tables = self.inner.write().await;
        std::mem::take(&mut tables.actors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_duplicate_domain_is_rejected() {
        let registry = Registry::new();
        let payment = Domain::from("PAYMENT");

        registry.register(&payment).await.unwrap();
        let err = registry.register(&payment).await.unwrap_err();
        assert!(matches!(err, BrokerError::DuplicateSubscriber { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_pair_is_rejected_but_many_topics_allowed() {
        let registry = Registry::new();
        let payment = Domain::from("PAYMENT");
        let created = Topic::from("ORDER_CREATED");
        let cancelled = Topic::from("ORDER_CANCELLED");

        registry.register(&payment).await.unwrap();
        registry.bind(&payment, &created).await.unwrap();
        registry.bind(&payment, &cancelled).await.unwrap();

        let err = registry.bind(&payment, &created).await.unwrap_err();
        assert!(matches!(err, BrokerError::DuplicateSubscription { .. }));
    }

    #[tokio::test]
    async fn test_fanout_lookup_preserves_subscription_order() {
        let registry = Registry::new();
        let topic = Topic::from("ORDER_CREATED");
        for name in ["PAYMENT", "INVENTORY", "NOTIFICATION"] {
            let d = Domain::from(name);
            registry.register(&d).await.unwrap();
            registry.bind(&d, &topic).await.unwrap();
        }

        let subs = registry.subscribers_of(&topic).await;
        let names: Vec<&str> = subs.iter().map(|d| d.as_str()).collect();
        assert_eq!(names, vec!["PAYMENT", "INVENTORY", "NOTIFICATION"]);

        assert!(registry.subscribers_of(&Topic::from("EMPTY")).await.is_empty());
    }
}
