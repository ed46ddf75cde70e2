//! Process-local hook registry.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use hookbus_core::result::HookResult;
use hookbus_core::traits::registry::{HookRegistry, sort_by_priority};
use hookbus_core::types::hook::{HookKind, HookRegistration};

/// Map-backed registry with no cross-process visibility.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    /// `(kind, name)` → sorted registrations.
    hooks: RwLock<HashMap<(HookKind, String), Vec<HookRegistration>>>,
}

impl MemoryRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HookRegistry for MemoryRegistry {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn set(&self, registration: HookRegistration) -> HookResult<()> {
        let mut hooks = self.hooks.write().await;
        let entries = hooks
            .entry((registration.kind, registration.name.clone()))
            .or_default();

        debug!(
            kind = %registration.kind,
            hook = %registration.name,
            priority = registration.priority,
            "Hook registered"
        );

        entries.push(registration);
        sort_by_priority(entries);
        Ok(())
    }

    async fn get(&self, kind: HookKind, name: &str) -> HookResult<Vec<HookRegistration>> {
        let hooks = self.hooks.read().await;
        Ok(hooks
            .get(&(kind, name.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn remove(
        &self,
        kind: HookKind,
        name: &str,
        descriptor: &str,
        priority: i32,
    ) -> HookResult<()> {
        let mut hooks = self.hooks.write().await;
        let key = (kind, name.to_string());
        if let Some(entries) = hooks.get_mut(&key) {
            entries.retain(|r| !r.matches(descriptor, priority));
            if entries.is_empty() {
                hooks.remove(&key);
            }
        }
        Ok(())
    }

    async fn clear(&self, kind: HookKind, name: &str, priority: Option<i32>) -> HookResult<()> {
        let mut hooks = self.hooks.write().await;
        let key = (kind, name.to_string());
        match priority {
            None => {
                hooks.remove(&key);
            }
            Some(priority) => {
                if let Some(entries) = hooks.get_mut(&key) {
                    entries.retain(|r| r.priority != priority);
                    if entries.is_empty() {
                        hooks.remove(&key);
                    }
                }
            }
        }
        Ok(())
    }
}
