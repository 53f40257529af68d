//! # Caller-supplied event handlers.
//!
//! A handler is the business-logic callback a subscription runs against each
//! delivered event. The broker treats it as opaque: it may suspend
//! arbitrarily (subject to the configured per-attempt timeout) and signals
//! failure by returning [`HandlerError`](crate::HandlerError).
//!
//! - [`handler`]: the [`Handler`] trait and [`HandlerRef`] alias;
//! - [`handler_fn`]: [`HandlerFn`], a closure-backed implementation.

mod handler;
mod handler_fn;

pub use handler::{Handler, HandlerRef};
pub use handler_fn::HandlerFn;
