//! Broker core: publish coordination, durable queues, and delivery.
//!
//! This module contains the embedded implementation of the durabus runtime.
//! The public API from this module is [`Broker`] (with [`BrokerBuilder`] and
//! [`SubscriberHandle`]), which coordinates publishing, fan-out, and
//! per-subscription delivery actors.
//!
//! Internal modules:
//! - [`log`]: per-topic append-only event log over the storage boundary;
//! - [`queue`]: subscriber queue manager with per-key linearization;
//! - [`registry`]: domain/topic binding tables and actor handles;
//! - [`runner`]: executes one delivery attempt with timeout and notices;
//! - [`actor`]: per-subscription delivery actor with the retry state machine;
//! - [`broker`]: the publish coordinator and subscription surface;
//! - [`builder`]: broker construction;
//! - [`locks`]: per-key async locks shared by log and queue manager.

mod actor;
mod broker;
mod builder;
mod locks;
mod log;
mod queue;
mod registry;
mod runner;

pub use broker::{Broker, SubscriberHandle};
pub use builder::BrokerBuilder;
