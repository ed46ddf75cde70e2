//! Shared-memory state driver for multi-worker processes.
//!
//! Records live in a fixed-capacity table whose data column has a fixed
//! width; both limits fail the write instead of truncating it. Each key has
//! its own async mutex, and a held lock is parked in the driver until
//! `unlock`, so lock and unlock may happen in different tasks.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, warn};

use hookbus_core::config::state::SharedStateConfig;
use hookbus_core::error::HookError;
use hookbus_core::result::HookResult;
use hookbus_core::traits::state::StateDriver;
use hookbus_core::types::hook::StateData;

use super::lock::KeyedLocks;

/// State driver over a table shared by every clone.
#[derive(Debug, Clone)]
pub struct SharedStateDriver {
    /// key → serialized data column.
    records: Arc<DashMap<String, String>>,
    /// Rows reserved against `layout.capacity`.
    rows: Arc<AtomicUsize>,
    locks: KeyedLocks,
    layout: SharedStateConfig,
    lock_timeout: Duration,
}

impl SharedStateDriver {
    /// Creates a table with the given layout and lock timeout.
    pub fn new(layout: SharedStateConfig, lock_timeout: Duration) -> Self {
        Self {
            records: Arc::new(DashMap::with_capacity(layout.capacity)),
            rows: Arc::new(AtomicUsize::new(0)),
            locks: KeyedLocks::new(),
            layout,
            lock_timeout,
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no records are stored.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl StateDriver for SharedStateDriver {
    fn driver(&self) -> &'static str {
        "shared"
    }

    async fn get(&self, key: &str) -> HookResult<StateData> {
        let Some(raw) = self.records.get(key).map(|r| r.value().clone()) else {
            return Ok(StateData::new());
        };
        Ok(serde_json::from_str(&raw)?)
    }

    async fn set(&self, key: &str, data: &StateData) -> HookResult<()> {
        let raw = serde_json::to_string(data)?;
        if raw.len() > self.layout.data_width {
            return Err(HookError::capacity(format!(
                "State for '{key}' is {} bytes, exceeding the table's {}-byte data column",
                raw.len(),
                self.layout.data_width
            )));
        }

        match self.records.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                occupied.insert(raw);
            }
            Entry::Vacant(vacant) => {
                let capacity = self.layout.capacity;
                let reserved = self
                    .rows
                    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                        (n < capacity).then_some(n + 1)
                    });
                if reserved.is_err() {
                    return Err(HookError::capacity(format!(
                        "Shared state table is full ({capacity} rows)"
                    )));
                }
                vacant.insert(raw);
            }
        }
        Ok(())
    }

    async fn lock(&self, key: &str) -> HookResult<bool> {
        if self.locks.acquire(key, self.lock_timeout).await {
            debug!(key, "Shared state lock acquired");
            Ok(true)
        } else {
            warn!(key, timeout_ms = self.lock_timeout.as_millis() as u64, "Shared state lock timed out");
            Ok(false)
        }
    }

    async fn unlock(&self, key: &str) -> HookResult<()> {
        self.locks.release(key);
        Ok(())
    }

    async fn flush(&self) -> HookResult<()> {
        self.records.retain(|_, _| {
            self.rows.fetch_sub(1, Ordering::AcqRel);
            false
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookbus_core::error::ErrorKind;
    use serde_json::json;

    fn driver(capacity: usize, data_width: usize, timeout_ms: u64) -> SharedStateDriver {
        SharedStateDriver::new(
            SharedStateConfig {
                capacity,
                data_width,
            },
            Duration::from_millis(timeout_ms),
        )
    }

    fn data(count: i64) -> StateData {
        let mut data = StateData::new();
        data.insert("count".to_string(), json!(count));
        data
    }

    #[tokio::test]
    async fn test_clones_share_records() {
        let worker_a = driver(4, 64, 100);
        let worker_b = worker_a.clone();
        worker_a.set("k", &data(7)).await.unwrap();
        assert_eq!(worker_b.get("k").await.unwrap(), data(7));
    }

    #[tokio::test]
    async fn test_data_wider_than_column_fails() {
        let driver = driver(4, 8, 100);
        let err = driver.set("k", &data(123_456_789)).await.unwrap_err();
        assert!(err.is(ErrorKind::Capacity));
        assert!(driver.is_empty());
    }

    #[tokio::test]
    async fn test_full_table_still_accepts_updates() {
        let driver = driver(1, 64, 100);
        driver.set("a", &data(1)).await.unwrap();
        assert!(driver.set("b", &data(1)).await.unwrap_err().is(ErrorKind::Capacity));
        driver.set("a", &data(2)).await.unwrap();
        assert_eq!(driver.get("a").await.unwrap(), data(2));
    }

    #[tokio::test]
    async fn test_flush_frees_capacity() {
        let driver = driver(1, 64, 100);
        driver.set("a", &data(1)).await.unwrap();
        driver.flush().await.unwrap();
        driver.set("b", &data(1)).await.unwrap();
        assert_eq!(driver.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_respect_capacity() {
        let driver = driver(8, 64, 100);
        let mut handles = Vec::new();
        for i in 0..64 {
            let driver = driver.clone();
            handles.push(tokio::spawn(async move {
                driver.set(&format!("key-{i}"), &data(i)).await.is_ok()
            }));
        }

        let mut stored = 0;
        for handle in handles {
            if handle.await.unwrap() {
                stored += 1;
            }
        }
        assert_eq!(stored, 8);
        assert_eq!(driver.len(), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_locker_times_out() {
        let driver = driver(4, 64, 2000);
        assert!(driver.lock("k").await.unwrap());
        assert!(!driver.lock("k").await.unwrap());
        // Other keys are independent.
        assert!(driver.lock("other").await.unwrap());
    }

    #[tokio::test]
    async fn test_second_locker_waits_for_unlock() {
        let driver = driver(4, 64, 2000);
        assert!(driver.lock("k").await.unwrap());

        let contender = driver.clone();
        let waiter = tokio::spawn(async move { contender.lock("k").await.unwrap() });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        driver.unlock("k").await.unwrap();
        assert!(waiter.await.unwrap());
    }
}
