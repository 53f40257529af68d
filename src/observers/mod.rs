//! # Notice observers for the broker runtime.
//!
//! Observers are the operator surface: every failed attempt, timeout,
//! redelivery, and dead-letter escalation is visible here as a
//! [`Notice`](crate::Notice), without touching the delivery path.
//!
//! ## Architecture
//! ```text
//! Notice flow:
//!   Broker/Actors ── publish(Notice) ──► Bus ──► notice_listener (in Broker)
//!                                                      │
//!                                               ObserverSet::emit(&Notice)
//!                                              ┌─────────┼─────────┐
//!                                              ▼         ▼         ▼
//!                                        [queue O1] [queue O2] [queue ON]
//!                                              │         │         │
//!                                        worker O1  worker O2  worker ON
//!                                              │         │         │
//!                                        on_notice() on_notice() on_notice()
//! ```
//!
//! ## Implementing custom observers
//! ```no_run
//! use async_trait::async_trait;
//! use durabus::{Notice, NoticeKind, Observe};
//!
//! struct FailureCounter;
//!
//! #[async_trait]
//! impl Observe for FailureCounter {
//!     async fn on_notice(&self, notice: &Notice) {
//!         if matches!(notice.kind, NoticeKind::DeliveryFailed) {
//!             // increment a counter, page someone, etc.
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "failure-counter" }
//! }
//! ```

mod log;
mod observe;
mod set;

pub use log::LogObserver;
pub use observe::Observe;
pub use set::ObserverSet;
