//! Inline action dispatch.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use hookbus_core::result::HookResult;
use hookbus_core::types::hook::HookRegistration;

use super::ActionDispatcher;
use crate::runner::HookRunner;

/// Runs each action registration immediately, in the caller's task.
#[derive(Debug, Clone)]
pub struct SyncDispatcher {
    runner: HookRunner,
}

impl SyncDispatcher {
    /// Creates a dispatcher that runs through `runner`.
    pub fn new(runner: HookRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl ActionDispatcher for SyncDispatcher {
    fn mode(&self) -> &'static str {
        "sync"
    }

    async fn dispatch(
        &self,
        hook: &str,
        registration: HookRegistration,
        args: &[Value],
    ) -> HookResult<()> {
        debug!(hook, priority = registration.priority, "Running action inline");
        // Action return values are discarded.
        self.runner.run_registration(&registration, args).await?;
        Ok(())
    }
}
