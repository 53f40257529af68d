//! # Handler abstraction.
//!
//! This module defines the [`Handler`] trait (async, fallible) and the common
//! handle type [`HandlerRef`], an `Arc<dyn Handler>` suitable for sharing
//! with the delivery actor that runs it.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::HandlerError;

/// Shared handle to a handler.
pub type HandlerRef = Arc<dyn Handler>;

/// # Asynchronous event-processing callback.
///
/// A `Handler` has a stable [`name`](Handler::name) and an async
/// [`handle`](Handler::handle) method invoked once per delivery attempt with
/// the event's id and payload.
///
/// Returning `Ok(())` acknowledges the event. Returning `Err` schedules a
/// redelivery (until the retry budget is exhausted). The broker may race the
/// call against a per-attempt timeout; a handler that suspends past the
/// deadline is treated as having failed that attempt.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use serde_json::Value;
/// use durabus::{Handler, HandlerError};
///
/// struct ReserveStock;
///
/// #[async_trait]
/// impl Handler for ReserveStock {
///     fn name(&self) -> &str { "reserve-stock" }
///
///     async fn handle(&self, _event_id: &str, content: &Value) -> Result<(), HandlerError> {
///         let qty = content["qty"].as_u64().ok_or_else(|| HandlerError::fail("missing qty"))?;
///         // reserve `qty` units...
///         let _ = qty;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Returns a stable, human-readable handler name (used in logs).
    fn name(&self) -> &str;

    /// Processes one delivery attempt for an event.
    ///
    /// Must be idempotent-safe: at-least-once delivery means the same event
    /// can be handed over again after a crash or timeout even if a previous
    /// attempt partially completed.
    async fn handle(&self, event_id: &str, content: &Value) -> Result<(), HandlerError>;
}
