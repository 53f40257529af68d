//! Error types used by the durabus broker and event handlers.
//!
//! This module defines two main error enums:
//!
//! - [`BrokerError`] — errors raised by the broker itself (configuration,
//!   persistence, broken durable invariants, shutdown).
//! - [`HandlerError`] — errors raised by individual delivery attempts.
//!
//! Both types provide `as_label` helpers for logging/metrics. The split
//! mirrors the propagation policy: broker errors surface to the caller that
//! triggered them, handler errors stay inside the delivery retry loop.

use std::time::Duration;
use thiserror::Error;

use crate::events::{Domain, Topic};
use crate::storage::StorageError;

/// # Errors produced by the broker.
///
/// Configuration errors (`DuplicateSubscriber`, `DuplicateSubscription`) are
/// fatal at setup time and never retried. Invariant errors (`QueueNotFound`,
/// `EventNotFound`) indicate corrupted or missing durable state and abort the
/// delivery attempt that hit them. Storage errors propagate from whichever
/// operation triggered the I/O.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BrokerError {
    /// The domain already registered a subscriber in this process lifetime.
    #[error("domain '{domain}' is already registered")]
    DuplicateSubscriber {
        /// The offending domain.
        domain: Domain,
    },

    /// This (domain, topic) pair is already subscribed.
    #[error("domain '{domain}' is already subscribed to topic '{topic}'")]
    DuplicateSubscription {
        /// Subscriber domain.
        domain: Domain,
        /// Topic of the rejected subscription.
        topic: Topic,
    },

    /// The durable queue document for a subscription is missing.
    #[error("queue document for '{domain}'/'{topic}' not found")]
    QueueNotFound {
        /// Subscriber domain.
        domain: Domain,
        /// Subscribed topic.
        topic: Topic,
    },

    /// An event id is absent from `processing_events` where it was expected.
    #[error("event '{event_id}' not found in queue '{domain}'/'{topic}'")]
    EventNotFound {
        /// Subscriber domain.
        domain: Domain,
        /// Subscribed topic.
        topic: Topic,
        /// The missing event id.
        event_id: String,
    },

    /// A persistence operation failed (distinct from not-found).
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Shutdown grace period was exceeded; some deliveries remained in flight.
    #[error("shutdown grace {grace:?} exceeded; forcing termination")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
    },
}

impl BrokerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            BrokerError::DuplicateSubscriber { .. } => "duplicate_subscriber",
            BrokerError::DuplicateSubscription { .. } => "duplicate_subscription",
            BrokerError::QueueNotFound { .. } => "queue_not_found",
            BrokerError::EventNotFound { .. } => "event_not_found",
            BrokerError::Storage(_) => "storage",
            BrokerError::GraceExceeded { .. } => "grace_exceeded",
        }
    }

    /// True for errors that indicate corrupted or missing durable state.
    ///
    /// These are fatal to the delivery attempt that hit them and are logged
    /// for operator attention rather than silently swallowed.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            BrokerError::QueueNotFound { .. } | BrokerError::EventNotFound { .. }
        )
    }
}

/// # Errors produced by a single delivery attempt.
///
/// Handler errors are expected and recoverable: they drive the retry state
/// machine and are recorded for diagnostics, never surfaced to the publisher.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HandlerError {
    /// The handler rejected the event; the attempt may succeed if retried.
    #[error("handler failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The handler did not settle within the configured timeout.
    #[error("handler timed out after {timeout:?}")]
    Timeout {
        /// The timeout that was exceeded.
        timeout: Duration,
    },
}

impl HandlerError {
    /// Shorthand for [`HandlerError::Fail`] from any displayable error.
    pub fn fail(error: impl std::fmt::Display) -> Self {
        HandlerError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::Fail { .. } => "handler_failed",
            HandlerError::Timeout { .. } => "handler_timeout",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            HandlerError::Fail { error } => format!("error: {error}"),
            HandlerError::Timeout { timeout } => format!("timeout: {timeout:?}"),
        }
    }
}
