//! Process-local state driver.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, warn};

use hookbus_core::config::state::StateConfig;
use hookbus_core::result::HookResult;
use hookbus_core::traits::state::StateDriver;
use hookbus_core::types::hook::StateData;

use super::lock::KeyedLocks;

/// State held in a concurrent map.
///
/// Tasks of one process still run shared callbacks concurrently, so every
/// key has its own async mutex and `lock` waits for it up to the timeout.
#[derive(Debug)]
pub struct MemoryStateDriver {
    records: DashMap<String, StateData>,
    locks: KeyedLocks,
    lock_timeout: Duration,
}

impl MemoryStateDriver {
    /// Creates an empty driver with the default lock timeout.
    pub fn new() -> Self {
        Self::with_lock_timeout(StateConfig::default().lock_timeout())
    }

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            records: DashMap::new(),
            locks: KeyedLocks::new(),
            lock_timeout,
        }
    }

    /// Whether `key` is currently locked.
    pub fn is_locked(&self, key: &str) -> bool {
        self.locks.is_held(key)
    }
}

impl Default for MemoryStateDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateDriver for MemoryStateDriver {
    fn driver(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> HookResult<StateData> {
        Ok(self
            .records
            .get(key)
            .map(|r| r.value().clone())
            .unwrap_or_default())
    }

    async fn set(&self, key: &str, data: &StateData) -> HookResult<()> {
        self.records.insert(key.to_string(), data.clone());
        Ok(())
    }

    async fn lock(&self, key: &str) -> HookResult<bool> {
        if self.locks.acquire(key, self.lock_timeout).await {
            debug!(key, "Memory state lock acquired");
            Ok(true)
        } else {
            warn!(key, timeout_ms = self.lock_timeout.as_millis() as u64, "Memory state lock timed out");
            Ok(false)
        }
    }

    async fn unlock(&self, key: &str) -> HookResult<()> {
        self.locks.release(key);
        Ok(())
    }

    async fn flush(&self) -> HookResult<()> {
        self.records.clear();
        Ok(())
    }
}
