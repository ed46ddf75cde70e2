//! Moves state between a [`StateDriver`] and stateful receivers.

use std::sync::Arc;

use tracing::debug;

use hookbus_core::result::HookResult;
use hookbus_core::traits::state::StateDriver;

use crate::target::Hookable;

/// Hydrates receivers before a call and persists them after.
///
/// The bridge never locks on its own; the runner brackets hydrate and
/// persist with [`lock`](Self::lock) and [`unlock`](Self::unlock).
#[derive(Debug, Clone)]
pub struct StateBridge {
    driver: Arc<dyn StateDriver>,
}

impl StateBridge {
    /// Creates a bridge over a driver.
    pub fn new(driver: Arc<dyn StateDriver>) -> Self {
        Self { driver }
    }

    /// The underlying driver.
    pub fn driver(&self) -> &Arc<dyn StateDriver> {
        &self.driver
    }

    /// Loads persisted state into `instance` if it is stateful.
    pub async fn hydrate(&self, key: &str, instance: &mut dyn Hookable) -> HookResult<()> {
        if instance.stateful().is_none() {
            return Ok(());
        }
        let data = self.driver.get(key).await?;
        debug!(key, fields = data.len(), "Hydrating stateful hook");
        if let Some(stateful) = instance.stateful() {
            stateful.hydrate(data);
        }
        Ok(())
    }

    /// Writes the state of `instance` back if it is stateful.
    pub async fn persist(&self, key: &str, instance: &mut dyn Hookable) -> HookResult<()> {
        let Some(stateful) = instance.stateful() else {
            return Ok(());
        };
        let data = stateful.extract();
        self.driver.set(key, &data).await
    }

    /// Acquires the lock for `key`. `false` means it timed out.
    pub async fn lock(&self, key: &str) -> HookResult<bool> {
        self.driver.lock(key).await
    }

    /// Releases the lock for `key`.
    pub async fn unlock(&self, key: &str) -> HookResult<()> {
        self.driver.unlock(key).await
    }

    /// Removes every persisted state record.
    pub async fn flush(&self) -> HookResult<()> {
        self.driver.flush().await
    }
}
