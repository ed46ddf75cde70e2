//! In-memory cache implementation using the moka crate.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use tracing::debug;

use hookbus_core::config::cache::MemoryCacheConfig;
use hookbus_core::result::HookResult;
use hookbus_core::traits::cache::CacheProvider;

/// A cached value together with its own TTL.
#[derive(Debug, Clone)]
struct CachedValue {
    value: String,
    ttl: Option<Duration>,
}

/// Expiry policy reading the TTL stored on each entry.
#[derive(Debug, Clone, Copy)]
struct PerEntryTtl;

impl Expiry<String, CachedValue> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

/// In-memory cache provider using moka.
///
/// Visible to every task in the process holding a clone. Entries without a
/// TTL never expire but still count toward `max_capacity`.
#[derive(Debug, Clone)]
pub struct MemoryCacheProvider {
    /// The underlying moka cache.
    cache: Cache<String, CachedValue>,
}

impl MemoryCacheProvider {
    /// Create a new in-memory cache from configuration.
    pub fn new(config: &MemoryCacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(PerEntryTtl)
            .build();

        Self { cache }
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    async fn get(&self, key: &str) -> HookResult<Option<String>> {
        Ok(self.cache.get(key).await.map(|entry| entry.value))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> HookResult<()> {
        self.cache
            .insert(
                key.to_string(),
                CachedValue {
                    value: value.to_string(),
                    ttl,
                },
            )
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> HookResult<()> {
        self.cache.remove(key).await;
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> HookResult<u64> {
        // Moka has no pattern scan; treat the pattern as a prefix and iterate.
        let prefix = pattern.trim_end_matches('*');
        let mut count = 0u64;

        let keys_to_remove: Vec<String> = self
            .cache
            .iter()
            .filter(|entry| entry.0.starts_with(prefix))
            .map(|entry| entry.0.to_string())
            .collect();

        for key in keys_to_remove {
            self.cache.remove(&key).await;
            count += 1;
        }

        debug!(pattern, count, "Deleted keys matching pattern");
        Ok(count)
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> HookResult<bool> {
        // The entry API initializes at most once per key, which makes this atomic.
        let value = CachedValue {
            value: value.to_string(),
            ttl: Some(ttl),
        };
        let entry = self
            .cache
            .entry(key.to_string())
            .or_insert_with(async move { value })
            .await;
        Ok(entry.is_fresh())
    }

    async fn delete_if_eq(&self, key: &str, expected: &str) -> HookResult<bool> {
        let outcome = self
            .cache
            .entry_by_ref(key)
            .and_compute_with(|current| {
                let op = match current {
                    Some(entry) if entry.value().value == expected => Op::Remove,
                    _ => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;
        Ok(matches!(outcome, CompResult::Removed(_)))
    }

    async fn health_check(&self) -> HookResult<bool> {
        Ok(true)
    }

    async fn flush_all(&self) -> HookResult<()> {
        self.cache.invalidate_all();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn make_provider() -> MemoryCacheProvider {
        MemoryCacheProvider::new(&MemoryCacheConfig { max_capacity: 1000 })
    }

    #[tokio::test]
    async fn test_set_get() {
        let provider = make_provider();
        provider.set("key1", "value1", None).await.unwrap();
        let val = provider.get("key1").await.unwrap();
        assert_eq!(val, Some("value1".to_string()));
    }

    #[tokio::test]
    async fn test_delete() {
        let provider = make_provider();
        provider.set("key2", "value2", None).await.unwrap();
        provider.delete("key2").await.unwrap();
        assert_eq!(provider.get("key2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_nx() {
        let provider = make_provider();
        let first = provider
            .set_nx("nx_key", "val", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(first);
        let second = provider
            .set_nx("nx_key", "val2", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(!second);
        assert_eq!(provider.get("nx_key").await.unwrap(), Some("val".to_string()));
    }

    #[tokio::test]
    async fn test_set_nx_has_single_winner() {
        let provider = Arc::new(make_provider());
        let mut handles = Vec::new();
        for i in 0..16 {
            let provider = Arc::clone(&provider);
            handles.push(tokio::spawn(async move {
                provider
                    .set_nx("race", &i.to_string(), Duration::from_secs(60))
                    .await
                    .unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_delete_if_eq_checks_value() {
        let provider = make_provider();
        provider.set("owner", "token-a", None).await.unwrap();

        assert!(!provider.delete_if_eq("owner", "token-b").await.unwrap());
        assert_eq!(provider.get("owner").await.unwrap(), Some("token-a".to_string()));

        assert!(provider.delete_if_eq("owner", "token-a").await.unwrap());
        assert_eq!(provider.get("owner").await.unwrap(), None);
        assert!(!provider.delete_if_eq("owner", "token-a").await.unwrap());
    }

    #[tokio::test]
    async fn test_entry_ttl_expires() {
        let provider = make_provider();
        provider
            .set("short", "v", Some(Duration::from_millis(20)))
            .await
            .unwrap();
        provider.set("forever", "v", None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(provider.get("short").await.unwrap(), None);
        assert_eq!(provider.get("forever").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_delete_pattern() {
        let provider = make_provider();
        provider.set("state:a", "1", None).await.unwrap();
        provider.set("state:b", "2", None).await.unwrap();
        provider.set("hooks:filter:x", "[]", None).await.unwrap();
        let removed = provider.delete_pattern("state:*").await.unwrap();
        assert_eq!(removed, 2);
        assert!(provider.get("hooks:filter:x").await.unwrap().is_some());
    }
}
