//! # Storage trait and error taxonomy for the persistence boundary.
//!
//! [`Storage`] is the contract the broker consumes: named-document get/put
//! with a distinct not-found signal. No append, lock, or transaction
//! primitives are assumed to exist below this layer; the queue manager
//! serializes its own read-modify-write cycles.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Shared handle to a storage backend.
pub type StorageRef = Arc<dyn Storage>;

/// # Errors produced by the persistence boundary.
///
/// `NotFound` means "this document does not exist yet" and is part of normal
/// operation (first access to a topic log or queue). `Io` and `Serde` are
/// real failures and propagate to whichever broker operation triggered them.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StorageError {
    /// The named document does not exist yet.
    #[error("document '{name}' not found")]
    NotFound {
        /// The requested document name.
        name: String,
    },

    /// Underlying I/O failure (distinct from not-found).
    #[error("i/o failure on document '{name}': {source}")]
    Io {
        /// The document name involved.
        name: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The document exists but could not be encoded/decoded.
    #[error("serialization failure on document '{name}': {source}")]
    Serde {
        /// The document name involved.
        name: String,
        /// The underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    /// True when the error is the benign "does not exist yet" case.
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

/// Named-document storage with get/put semantics.
///
/// Implementations must:
/// - return [`StorageError::NotFound`] for absent documents (never an empty
///   byte vector or an I/O error);
/// - overwrite wholesale on `put` (last write wins);
/// - be safe to call concurrently for **different** names. Concurrent
///   access to the same name is linearized by the caller.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    /// Reads the raw bytes of a named document.
    async fn get(&self, name: &str) -> Result<Vec<u8>, StorageError>;

    /// Writes (or overwrites) a named document wholesale.
    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<(), StorageError>;
}

/// Loads and decodes a named JSON document.
pub(crate) async fn load<T: DeserializeOwned>(
    store: &dyn Storage,
    name: &str,
) -> Result<T, StorageError> {
    let bytes = store.get(name).await?;
    serde_json::from_slice(&bytes).map_err(|source| StorageError::Serde {
        name: name.to_owned(),
        source,
    })
}

/// Encodes and persists a named JSON document.
pub(crate) async fn save<T: Serialize>(
    store: &dyn Storage,
    name: &str,
    doc: &T,
) -> Result<(), StorageError> {
    let bytes = serde_json::to_vec_pretty(doc).map_err(|source| StorageError::Serde {
        name: name.to_owned(),
        source,
    })?;
    store.put(name, bytes).await
}
