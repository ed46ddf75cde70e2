//! State driver backed by the external cache service.
//!
//! Locks are set-if-absent keys with a TTL, so a process that dies while
//! holding one blocks the key for at most the TTL. Each acquisition stores a
//! fresh token and `unlock` deletes the key only while it still holds that
//! token, so a holder that outlived the TTL cannot release its successor.
//! Tasks of one process queue on a local per-key mutex before touching the
//! cache.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use hookbus_cache::CacheManager;
use hookbus_cache::keys;
use hookbus_core::config::state::StateConfig;
use hookbus_core::result::HookResult;
use hookbus_core::traits::cache::CacheProvider;
use hookbus_core::traits::state::StateDriver;
use hookbus_core::types::hook::StateData;

use super::lock::KeyedLocks;

/// Lock timing for [`CacheStateDriver`].
#[derive(Debug, Clone, Copy)]
pub struct LockSettings {
    /// Give up after this long.
    pub timeout: Duration,
    /// Delay between set-if-absent attempts.
    pub poll_interval: Duration,
    /// Expiry of the lock key.
    pub ttl: Duration,
}

impl From<&StateConfig> for LockSettings {
    fn from(config: &StateConfig) -> Self {
        Self {
            timeout: config.lock_timeout(),
            poll_interval: config.lock_poll_interval(),
            ttl: config.lock_ttl(),
        }
    }
}

impl Default for LockSettings {
    fn default() -> Self {
        Self::from(&StateConfig::default())
    }
}

/// State driver over a [`CacheManager`].
#[derive(Debug, Clone)]
pub struct CacheStateDriver {
    cache: Arc<CacheManager>,
    locks: LockSettings,
    local: KeyedLocks,
    /// key → token of the lock this process holds.
    tokens: Arc<DashMap<String, String>>,
}

impl CacheStateDriver {
    /// Creates a driver with the given lock timing.
    pub fn new(cache: Arc<CacheManager>, locks: LockSettings) -> Self {
        Self {
            cache,
            locks,
            local: KeyedLocks::new(),
            tokens: Arc::new(DashMap::new()),
        }
    }

    fn timed_out(&self, key: &str) -> HookResult<bool> {
        warn!(key, timeout_ms = self.locks.timeout.as_millis() as u64, "Cache state lock timed out");
        Ok(false)
    }
}

#[async_trait]
impl StateDriver for CacheStateDriver {
    fn driver(&self) -> &'static str {
        "cache"
    }

    async fn get(&self, key: &str) -> HookResult<StateData> {
        Ok(self
            .cache
            .get_json::<StateData>(&keys::state_record(key))
            .await?
            .unwrap_or_default())
    }

    async fn set(&self, key: &str, data: &StateData) -> HookResult<()> {
        self.cache
            .set_json(&keys::state_record(key), data, None)
            .await
    }

    async fn lock(&self, key: &str) -> HookResult<bool> {
        let deadline = Instant::now() + self.locks.timeout;
        if !self.local.acquire(key, self.locks.timeout).await {
            return self.timed_out(key);
        }

        let lock_key = keys::state_lock(key);
        let token = Uuid::new_v4().to_string();
        loop {
            match self.cache.set_nx(&lock_key, &token, self.locks.ttl).await {
                Ok(true) => {
                    self.tokens.insert(key.to_string(), token);
                    debug!(key, "Cache state lock acquired");
                    return Ok(true);
                }
                Ok(false) => {}
                Err(e) => {
                    self.local.release(key);
                    return Err(e);
                }
            }
            if Instant::now() >= deadline {
                self.local.release(key);
                return self.timed_out(key);
            }
            tokio::time::sleep(self.locks.poll_interval).await;
        }
    }

    async fn unlock(&self, key: &str) -> HookResult<()> {
        let Some((_, token)) = self.tokens.remove(key) else {
            return Ok(());
        };
        let released = self
            .cache
            .delete_if_eq(&keys::state_lock(key), &token)
            .await;
        self.local.release(key);

        if !released? {
            warn!(key, "Cache state lock expired before release");
        }
        Ok(())
    }

    async fn flush(&self) -> HookResult<()> {
        let removed = self.cache.delete_pattern(&keys::state_pattern()).await?;
        debug!(removed, "Cache state records flushed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookbus_core::config::cache::CacheConfig;
    use serde_json::json;

    async fn cache() -> Arc<CacheManager> {
        Arc::new(CacheManager::new(&CacheConfig::default()).await.unwrap())
    }

    fn driver_on(cache: &Arc<CacheManager>, timeout_ms: u64, ttl_ms: u64) -> CacheStateDriver {
        CacheStateDriver::new(
            Arc::clone(cache),
            LockSettings {
                timeout: Duration::from_millis(timeout_ms),
                poll_interval: Duration::from_millis(1),
                ttl: Duration::from_millis(ttl_ms),
            },
        )
    }

    async fn driver(timeout_ms: u64) -> CacheStateDriver {
        driver_on(&cache().await, timeout_ms, 10_000)
    }

    #[tokio::test]
    async fn test_state_round_trip_and_flush() {
        let driver = driver(50).await;
        let mut data = StateData::new();
        data.insert("seen".to_string(), json!(["a", "b"]));

        driver.set("k", &data).await.unwrap();
        assert_eq!(driver.get("k").await.unwrap(), data);

        driver.flush().await.unwrap();
        assert!(driver.get("k").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_flush_keeps_held_locks() {
        let driver = driver(20).await;
        assert!(driver.lock("k").await.unwrap());
        driver.flush().await.unwrap();
        assert!(!driver.lock("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_lock_is_exclusive_until_unlocked() {
        let driver = driver(20).await;
        assert!(driver.lock("k").await.unwrap());
        assert!(!driver.lock("k").await.unwrap());
        driver.unlock("k").await.unwrap();
        assert!(driver.lock("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_waiter_acquires_after_release() {
        let driver = driver(2000).await;
        assert!(driver.lock("k").await.unwrap());

        let contender = driver.clone();
        let waiter = tokio::spawn(async move { contender.lock("k").await.unwrap() });
        tokio::time::sleep(Duration::from_millis(20)).await;
        driver.unlock("k").await.unwrap();

        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn test_lock_excludes_other_processes() {
        let cache = cache().await;
        let process_a = driver_on(&cache, 20, 10_000);
        let process_b = driver_on(&cache, 20, 10_000);

        assert!(process_a.lock("k").await.unwrap());
        assert!(!process_b.lock("k").await.unwrap());
        process_a.unlock("k").await.unwrap();
        assert!(process_b.lock("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_holder_cannot_release_successor() {
        let cache = cache().await;
        let slow = driver_on(&cache, 20, 30);
        let successor = driver_on(&cache, 20, 10_000);
        let third = driver_on(&cache, 20, 10_000);

        assert!(slow.lock("k").await.unwrap());
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(successor.lock("k").await.unwrap());

        // The stale holder's unlock leaves the successor's lock in place.
        slow.unlock("k").await.unwrap();
        assert!(!third.lock("k").await.unwrap());

        successor.unlock("k").await.unwrap();
        assert!(third.lock("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_unlock_without_lock_is_harmless() {
        let driver = driver(20).await;
        driver.unlock("k").await.unwrap();
        assert!(driver.lock("k").await.unwrap());
    }
}
