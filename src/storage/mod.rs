//! # Persistence boundary: named JSON documents.
//!
//! The broker persists everything as named JSON documents through the
//! [`Storage`] trait: per-topic event logs, per-subscription queues, and the
//! dead-letter record. The trait offers plain get/put semantics and
//! distinguishes "not found" from I/O failure; any required atomicity above
//! that (read-modify-write linearization) is the broker's responsibility.
//!
//! - [`store`]: the [`Storage`] trait, [`StorageError`], typed load/save;
//! - [`json`]: [`JsonFileStore`], one file per document under a data dir;
//! - [`memory`]: [`MemoryStore`], a HashMap-backed store for tests and
//!   disk-free embedding;
//! - [`docs`]: the persisted document shapes.

mod docs;
mod json;
mod memory;
mod store;

pub use docs::{
    DeadLetterDoc, DeadLetterEntry, EventLogDoc, LoggedEvent, ProcessedEntry, ProcessingEntry,
    QueueDoc,
};
pub use json::JsonFileStore;
pub use memory::MemoryStore;
pub use store::{Storage, StorageError, StorageRef};

pub(crate) use docs::{event_log_name, queue_name, DEAD_LETTER_NAME};
pub(crate) use store::{load as load_doc, save as save_doc};
