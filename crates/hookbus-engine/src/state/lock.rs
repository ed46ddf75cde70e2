//! Per-key async mutexes whose guards are parked until released.
//!
//! `StateDriver::lock` and `unlock` are separate calls that may run in
//! different tasks, so an acquired guard is stored here rather than held on
//! the caller's stack.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Named locks shared by every clone.
#[derive(Debug, Clone, Default)]
pub struct KeyedLocks {
    mutexes: Arc<DashMap<String, Arc<Mutex<()>>>>,
    held: Arc<DashMap<String, OwnedMutexGuard<()>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits up to `timeout` for `key`; `false` when it stayed held.
    pub async fn acquire(&self, key: &str, timeout: Duration) -> bool {
        let mutex = Arc::clone(&self.mutexes.entry(key.to_string()).or_default());
        match tokio::time::timeout(timeout, mutex.lock_owned()).await {
            Ok(guard) => {
                self.held.insert(key.to_string(), guard);
                true
            }
            Err(_) => false,
        }
    }

    /// Releases `key`. Releasing a key that is not held does nothing.
    pub fn release(&self, key: &str) {
        // Dropping the guard wakes the next waiter.
        self.held.remove(key);
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.held.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_held_key_times_out() {
        let locks = KeyedLocks::new();
        assert!(locks.acquire("k", Duration::from_secs(2)).await);
        assert!(!locks.acquire("k", Duration::from_secs(2)).await);
        assert!(locks.acquire("other", Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn test_release_from_another_task() {
        let locks = KeyedLocks::new();
        assert!(locks.acquire("k", Duration::from_secs(2)).await);

        let releaser = locks.clone();
        tokio::spawn(async move { releaser.release("k") }).await.unwrap();

        assert!(!locks.is_held("k"));
        assert!(locks.acquire("k", Duration::from_millis(10)).await);
        locks.release("k");
        locks.release("k");
    }
}
