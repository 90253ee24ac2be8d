//! Per-key async mutual exclusion.
//!
//! Reconciliation of one budget or one wallet must never interleave with
//! another reconciliation of the same entity. Different keys proceed in
//! parallel.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// A table of async mutexes addressed by string keys. An entry lives only
/// while someone holds or waits for its key.
#[derive(Default)]
pub struct KeyedLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

/// Holds a key of [`KeyedLocks`]. Dropping the last guard of a key with no
/// waiters removes the key from the table.
pub struct KeyedLockGuard<'a> {
    locks: &'a KeyedLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyedLockGuard<'_> {
    fn drop(&mut self) {
        // The table and this guard own one reference each; any more means a
        // waiter already cloned the mutex. `remove_if` runs under the shard
        // lock, so no new waiter can clone it while we check.
        self.locks
            .locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) <= 2);
        self.guard.take();
    }
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other holder of `key` remains and returns the guard.
    pub async fn lock(&self, key: &str) -> KeyedLockGuard<'_> {
        // Clone the Arc out so the DashMap shard is not held across the await.
        let mutex = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = mutex.lock_owned().await;
        KeyedLockGuard {
            locks: self,
            key: key.to_string(),
            guard: Some(guard),
        }
    }

    /// Drops entries nobody holds or waits on. Only needed after waiters
    /// were cancelled, which skips the cleanup in the guard.
    pub fn prune(&self) {
        self.locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

pub fn budget_key(budget_id: &str) -> String {
    format!("budget:{}", budget_id)
}

pub fn wallet_key(wallet_id: &str) -> String {
    format!("wallet:{}", wallet_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = Arc::new(KeyedLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let inside = inside.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock("budget:1").await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let _a = locks.lock(&budget_key("a")).await;
        let _b = tokio::time::timeout(Duration::from_millis(50), locks.lock(&wallet_key("a")))
            .await
            .expect("independent keys must not block each other");
    }

    #[tokio::test]
    async fn test_released_keys_leave_the_table() {
        let locks = KeyedLocks::new();
        for i in 0..100 {
            let _guard = locks.lock(&budget_key(&i.to_string())).await;
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_key_with_a_waiter_survives_release() {
        let locks = Arc::new(KeyedLocks::new());
        let first = locks.lock("k").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock("k").await;
                locks.len()
            })
        };
        // Let the waiter clone the mutex before the holder lets go.
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(first);

        assert_eq!(waiter.await.unwrap(), 1);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_waiter_leaves_nothing_behind() {
        let locks = KeyedLocks::new();
        let held = locks.lock("k").await;
        let cancelled = tokio::time::timeout(Duration::from_millis(10), locks.lock("k")).await;
        assert!(cancelled.is_err());
        drop(held);
        locks.prune();
        assert!(locks.is_empty());
    }
}
