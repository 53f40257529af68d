//! # In-memory storage for tests and disk-free embedding.
//!
//! [`MemoryStore`] keeps documents in a `HashMap` behind an async mutex. It
//! honors the same contract as the file store (distinct not-found, wholesale
//! overwrite) and is cheaply cloneable, so a test can keep a handle and
//! inspect documents the broker wrote.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::store::{Storage, StorageError};

/// HashMap-backed storage backend.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    docs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the names of all stored documents, sorted.
    pub async fn document_names(&self) -> Vec<String> {
        let docs = self.docs.lock().await;
        let mut names: Vec<String> = docs.keys().cloned().collect();
        names.sort_unstable();
        names
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn get(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        let docs = self.docs.lock().await;
        docs.get(name).cloned().ok_or_else(|| StorageError::NotFound {
            name: name.to_owned(),
        })
    }

    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        let mut docs = self.docs.lock().await;
        docs.insert(name.to_owned(), bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_not_found_vs_present() {
        let store = MemoryStore::new();
        assert!(store.get("nope").await.unwrap_err().is_not_found());

        store.put("doc", vec![1, 2, 3]).await.unwrap();
        assert_eq!(store.get("doc").await.unwrap(), vec![1, 2, 3]);
        assert_eq!(store.document_names().await, vec!["doc".to_string()]);
    }
}
