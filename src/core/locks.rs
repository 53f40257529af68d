//! # Per-key async locks.
//!
//! The storage boundary offers no locking of its own, so every
//! read-modify-write cycle on a named document must be linearized above it.
//! [`KeyedLocks`] hands out one async mutex per key; holding the guard across
//! the load/mutate/persist sequence makes concurrent mutations of the same
//! document (publish-path enqueue vs delivery-path increment/acknowledge)
//! strictly sequential.
//!
//! Locks are created on first use and kept for the process lifetime; the key
//! space (topics × subscriptions) is small and bounded by configuration.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Map of named async mutexes, one per document key.
#[derive(Debug, Default)]
pub(crate) struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for `key`, creating it on first use.
    pub(crate) async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(key.to_owned()).or_default())
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_same_key_is_mutually_exclusive() {
        let locks = Arc::new(KeyedLocks::new());
        let running = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();

        for _ in 0..8 {
            let locks = Arc::clone(&locks);
            let running = Arc::clone(&running);
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire("queue-A-T").await;
                assert_eq!(running.fetch_add(1, Ordering::SeqCst), 0);
                tokio::task::yield_now().await;
                running.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_contend() {
        let locks = KeyedLocks::new();
        let _a = locks.acquire("a").await;
        // A second key must be acquirable while the first is held.
        let _b = locks.acquire("b").await;
    }
}
