//! # Notice observer trait.
//!
//! Provides [`Observe`], the extension point for plugging custom notice
//! handlers into the broker (logging, metrics, alerting, audit).
//!
//! Each observer gets:
//! - **Dedicated worker task** (runs independently)
//! - **Per-observer bounded queue** (capacity via [`Observe::queue_capacity`])
//! - **Panic isolation** (panics are caught and reported as
//!   `NoticeKind::ObserverPanicked`)
//!
//! ## Rules
//! - A slow observer only affects its own queue.
//! - Queue overflow drops the notice **for this observer only** and publishes
//!   `NoticeKind::ObserverOverflow`; other observers are unaffected.
//! - Notices are processed sequentially (FIFO) per observer.
//! - Observers never block the publish or delivery paths.

use async_trait::async_trait;

use crate::events::Notice;

/// Notice observer for broker observability.
///
/// Each observer runs in isolation:
/// - **Bounded queue** buffers notices (capacity via [`Self::queue_capacity`]).
/// - **Dedicated worker task** processes notices sequentially (FIFO).
/// - **Panic isolation**: panics are caught and reported.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Handle errors internally; do not panic.
#[async_trait]
pub trait Observe: Send + Sync + 'static {
    /// Processes a single notice.
    ///
    /// Called from a dedicated worker task, never in the publisher context.
    async fn on_notice(&self, notice: &Notice);

    /// Returns the observer name used in logs and overflow/panic notices.
    ///
    /// Prefer short, descriptive names (e.g., "metrics", "audit").
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns the preferred queue capacity for this observer.
    ///
    /// On overflow the new notice is dropped for this observer only and an
    /// `ObserverOverflow` notice is published. The runtime clamps capacity
    /// to a minimum of 1. Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
