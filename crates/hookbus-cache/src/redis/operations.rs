//! [`CacheProvider`] over Redis.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

use hookbus_core::error::{ErrorKind, HookError};
use hookbus_core::result::HookResult;
use hookbus_core::traits::cache::CacheProvider;

use super::client::RedisClient;

/// Keys examined per SCAN round trip.
const SCAN_BATCH: usize = 500;

/// Deletes KEYS[1] only if it still holds ARGV[1].
static DELETE_IF_EQ: LazyLock<redis::Script> = LazyLock::new(|| {
    redis::Script::new(
        r"if redis.call('GET', KEYS[1]) == ARGV[1] then
            return redis.call('DEL', KEYS[1])
        end
        return 0",
    )
});

/// Redis-backed cache provider.
#[derive(Debug, Clone)]
pub struct RedisCacheProvider {
    client: RedisClient,
}

impl RedisCacheProvider {
    /// Wraps a connected client.
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }
}

fn cache_err(e: redis::RedisError) -> HookError {
    HookError::with_source(ErrorKind::Cache, format!("Redis command failed: {e}"), e)
}

/// Redis expiries are whole milliseconds and must be positive.
fn millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl CacheProvider for RedisCacheProvider {
    async fn get(&self, key: &str) -> HookResult<Option<String>> {
        self.client
            .conn()
            .get(self.client.key(key))
            .await
            .map_err(cache_err)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> HookResult<()> {
        let key = self.client.key(key);
        let mut conn = self.client.conn();
        match ttl {
            Some(ttl) => conn
                .pset_ex(key, value, millis(ttl))
                .await
                .map_err(cache_err),
            None => conn.set(key, value).await.map_err(cache_err),
        }
    }

    async fn delete(&self, key: &str) -> HookResult<()> {
        self.client
            .conn()
            .del(self.client.key(key))
            .await
            .map_err(cache_err)
    }

    /// Walks the namespace with SCAN so large keyspaces never block the server.
    async fn delete_pattern(&self, pattern: &str) -> HookResult<u64> {
        let pattern = self.client.key(pattern);
        let mut conn = self.client.conn();
        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(cache_err)?;

            if !batch.is_empty() {
                let deleted: u64 = conn.del(&batch).await.map_err(cache_err)?;
                removed += deleted;
            }
            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!(pattern = %pattern, removed, "Deleted Redis keys");
        Ok(removed)
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> HookResult<bool> {
        let reply: Option<String> = redis::cmd("SET")
            .arg(self.client.key(key))
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(millis(ttl))
            .query_async(&mut self.client.conn())
            .await
            .map_err(cache_err)?;
        Ok(reply.is_some())
    }

    async fn delete_if_eq(&self, key: &str, expected: &str) -> HookResult<bool> {
        let deleted: u64 = DELETE_IF_EQ
            .key(self.client.key(key))
            .arg(expected)
            .invoke_async(&mut self.client.conn())
            .await
            .map_err(cache_err)?;
        Ok(deleted > 0)
    }

    async fn health_check(&self) -> HookResult<bool> {
        let reply: String = redis::cmd("PING")
            .query_async(&mut self.client.conn())
            .await
            .map_err(cache_err)?;
        Ok(reply == "PONG")
    }

    async fn flush_all(&self) -> HookResult<()> {
        // Only this namespace; other tenants of the server are untouched.
        self.delete_pattern("*").await.map(|_| ())
    }
}
