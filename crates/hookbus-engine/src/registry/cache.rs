//! Hook registry stored in the external cache service.
//!
//! Each `(kind, name)` list is one JSON value. Mutations are
//! read-modify-write and therefore NOT atomic across processes: two
//! processes registering on the same hook at the same moment can lose one
//! registration. Register hooks during boot, before traffic, when using this
//! backend.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use hookbus_cache::CacheManager;
use hookbus_cache::keys;
use hookbus_core::result::HookResult;
use hookbus_core::traits::cache::CacheProvider;
use hookbus_core::traits::registry::HookRegistry;
use hookbus_core::types::hook::{HookKind, HookRegistration, RegistrationEntry};

/// Registry backed by a [`CacheManager`].
#[derive(Debug, Clone)]
pub struct CacheRegistry {
    cache: Arc<CacheManager>,
}

impl CacheRegistry {
    /// Creates a registry on top of a cache manager.
    pub fn new(cache: Arc<CacheManager>) -> Self {
        Self { cache }
    }

    async fn load(&self, key: &str) -> HookResult<Vec<RegistrationEntry>> {
        Ok(self
            .cache
            .get_json::<Vec<RegistrationEntry>>(key)
            .await?
            .unwrap_or_default())
    }

    async fn store(&self, key: &str, entries: &[RegistrationEntry]) -> HookResult<()> {
        if entries.is_empty() {
            self.cache.delete(key).await
        } else {
            self.cache.set_json(key, &entries, None).await
        }
    }
}

#[async_trait]
impl HookRegistry for CacheRegistry {
    fn backend(&self) -> &'static str {
        "cache"
    }

    async fn set(&self, registration: HookRegistration) -> HookResult<()> {
        let key = keys::hook_list(registration.kind, &registration.name);
        let mut entries = self.load(&key).await?;
        entries.push(registration.to_entry());
        entries.sort_by_key(|e| e.priority);
        self.store(&key, &entries).await?;

        debug!(
            kind = %registration.kind,
            hook = %registration.name,
            priority = registration.priority,
            "Hook registered in cache"
        );
        Ok(())
    }

    async fn get(&self, kind: HookKind, name: &str) -> HookResult<Vec<HookRegistration>> {
        let entries = self.load(&keys::hook_list(kind, name)).await?;
        Ok(entries
            .into_iter()
            .map(|entry| HookRegistration::from_entry(kind, name, entry))
            .collect())
    }

    async fn remove(
        &self,
        kind: HookKind,
        name: &str,
        descriptor: &str,
        priority: i32,
    ) -> HookResult<()> {
        let key = keys::hook_list(kind, name);
        let mut entries = self.load(&key).await?;
        let before = entries.len();
        entries.retain(|e| !(e.descriptor == descriptor && e.priority == priority));
        if entries.len() != before {
            self.store(&key, &entries).await?;
        }
        Ok(())
    }

    async fn clear(&self, kind: HookKind, name: &str, priority: Option<i32>) -> HookResult<()> {
        let key = keys::hook_list(kind, name);
        let Some(priority) = priority else {
            return self.cache.delete(&key).await;
        };

        let mut entries = self.load(&key).await?;
        let before = entries.len();
        entries.retain(|e| e.priority != priority);
        if entries.len() != before {
            self.store(&key, &entries).await?;
        }
        Ok(())
    }
}
