//! # Delivery policies.
//!
//! - [`retry`]: bounded, fixed-delay retry policy driving the per-event
//!   delivery state machine.

mod retry;

pub use retry::RetryPolicy;
