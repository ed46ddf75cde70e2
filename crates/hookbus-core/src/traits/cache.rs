//! Cache provider trait for the external key-value service.

use std::time::Duration;

use async_trait::async_trait;

use crate::result::HookResult;

/// Trait for cache backends (Redis or in-memory).
///
/// All values are strings (JSON). The provider is responsible for key
/// prefixing and TTL enforcement. A `None` TTL stores the value without
/// expiry; hook registrations and state records rely on that.
#[async_trait]
pub trait CacheProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Get a value by key. Returns `None` if the key does not exist or has expired.
    async fn get(&self, key: &str) -> HookResult<Option<String>>;

    /// Set a value, optionally with a TTL.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> HookResult<()>;

    /// Delete a key from the cache.
    async fn delete(&self, key: &str) -> HookResult<()>;

    /// Delete all keys matching a trailing-wildcard pattern (e.g. `"state:*"`).
    async fn delete_pattern(&self, pattern: &str) -> HookResult<u64>;

    /// Set a value only if the key does not already exist (NX).
    /// Returns `true` if the value was set, `false` if the key already existed.
    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> HookResult<bool>;

    /// Delete a key only while it still holds `expected`, as one atomic step.
    /// Returns `true` if the key was deleted.
    async fn delete_if_eq(&self, key: &str, expected: &str) -> HookResult<bool>;

    /// Get a typed value by deserializing from JSON.
    async fn get_json<T: serde::de::DeserializeOwned + Send>(
        &self,
        key: &str,
    ) -> HookResult<Option<T>>
    where
        Self: Sized,
    {
        match self.get(key).await? {
            Some(value) => {
                let parsed = serde_json::from_str(&value)?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    /// Set a typed value by serializing to JSON.
    async fn set_json<T: serde::Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> HookResult<()>
    where
        Self: Sized,
    {
        let json = serde_json::to_string(value)?;
        self.set(key, &json, ttl).await
    }

    /// Check that the cache backend is reachable.
    async fn health_check(&self) -> HookResult<bool>;

    /// Flush every entry owned by this provider.
    async fn flush_all(&self) -> HookResult<()>;
}
