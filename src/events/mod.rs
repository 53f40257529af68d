//! # Event model and in-process notice bus.
//!
//! This module contains the published-event model and the broadcast bus
//! that decouples the publish path from the delivery actors:
//! - [`event`]: `Domain`/`Topic` labels and the immutable [`Event`];
//! - [`notice`]: [`Notice`]/[`NoticeKind`] lifecycle notifications;
//! - [`bus`]: [`Bus`], a broadcast channel for notices.

mod bus;
mod event;
mod notice;

pub use bus::Bus;
pub use event::{Domain, Event, Topic};
pub use notice::{Notice, NoticeKind};
