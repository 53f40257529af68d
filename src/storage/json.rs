//! # File-backed storage: one JSON file per named document.
//!
//! [`JsonFileStore`] maps each document name to `<data_dir>/<name>.json`.
//! Writes go to a temporary sibling first and are renamed into place, so a
//! crash mid-write leaves the previous version intact rather than a
//! truncated file.
//!
//! Document names produced by the broker (`events-<topic>`,
//! `queue-<subscriber>-<topic>`, `dead-letter-queue`) are used verbatim as
//! file stems; callers supplying their own labels should keep them
//! path-safe.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::store::{Storage, StorageError};

/// Storage backend persisting each document as a JSON file in a directory.
#[derive(Debug)]
pub struct JsonFileStore {
    data_dir: PathBuf,
}

impl JsonFileStore {
    /// Creates a store rooted at `data_dir`, creating the directory if needed.
    pub async fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)
            .await
            .map_err(|source| StorageError::Io {
                name: data_dir.display().to_string(),
                source,
            })?;
        Ok(Self { data_dir })
    }

    /// Returns the directory documents are stored under.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{name}.json"))
    }
}

#[async_trait]
impl Storage for JsonFileStore {
    async fn get(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        match fs::read(self.path_for(name)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound {
                name: name.to_owned(),
            }),
            Err(source) => Err(StorageError::Io {
                name: name.to_owned(),
                source,
            }),
        }
    }

    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            name: name.to_owned(),
            source,
        };

        let target = self.path_for(name);
        let tmp = self.data_dir.join(format!("{name}.json.tmp"));
        fs::write(&tmp, bytes).await.map_err(io_err)?;
        fs::rename(&tmp, &target).await.map_err(io_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_absent_document_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();

        let err = store.get("events-MISSING").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_put_then_get_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();

        store.put("doc", b"{\"a\":1}".to_vec()).await.unwrap();
        let bytes = store.get("doc").await.unwrap();
        assert_eq!(bytes, b"{\"a\":1}");

        // Overwrite is wholesale.
        store.put("doc", b"{\"a\":2}".to_vec()).await.unwrap();
        let bytes = store.get("doc").await.unwrap();
        assert_eq!(bytes, b"{\"a\":2}");
    }

    #[tokio::test]
    async fn test_documents_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JsonFileStore::open(dir.path()).await.unwrap();
            store.put("doc", b"persisted".to_vec()).await.unwrap();
        }
        let store = JsonFileStore::open(dir.path()).await.unwrap();
        assert_eq!(store.get("doc").await.unwrap(), b"persisted");
    }
}
