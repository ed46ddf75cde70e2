//! The action/filter API.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use hookbus_core::result::HookResult;
use hookbus_core::traits::registry::HookRegistry;
use hookbus_core::types::hook::{HookKind, HookRegistration, StateKind};

use crate::codec::{self, Callback};
use crate::dispatch::ActionDispatcher;
use crate::pipeline::{FilterStage, Pipeline, RunnerStage};
use crate::runner::HookRunner;

/// Priority used when the registrant does not care.
pub const DEFAULT_PRIORITY: i32 = 10;

/// Registers, removes, and fires actions and filters.
///
/// One manager is built at boot and shared as `Arc<HookManager>`.
#[derive(Debug, Clone)]
pub struct HookManager {
    registry: Arc<dyn HookRegistry>,
    dispatcher: Arc<dyn ActionDispatcher>,
    runner: HookRunner,
}

impl HookManager {
    /// Creates a manager over the given collaborators.
    pub fn new(
        registry: Arc<dyn HookRegistry>,
        dispatcher: Arc<dyn ActionDispatcher>,
        runner: HookRunner,
    ) -> Self {
        info!(
            registry = registry.backend(),
            state = runner.bridge().driver().driver(),
            dispatcher = dispatcher.mode(),
            "Hook manager ready"
        );
        Self {
            registry,
            dispatcher,
            runner,
        }
    }

    /// The registry holding registrations.
    pub fn registry(&self) -> &Arc<dyn HookRegistry> {
        &self.registry
    }

    /// The action dispatcher.
    pub fn dispatcher(&self) -> &Arc<dyn ActionDispatcher> {
        &self.dispatcher
    }

    /// The runner used for filters and inline actions.
    pub fn runner(&self) -> &HookRunner {
        &self.runner
    }

    // ── Filters ───────────────────────────────────────────

    /// Registers a filter callback.
    ///
    /// Fails with `Oversize` when the encoded callback is too large, in
    /// which case nothing is registered.
    pub async fn add_filter(
        &self,
        hook: &str,
        callback: &Callback,
        priority: i32,
        state_kind: StateKind,
    ) -> HookResult<()> {
        self.add(HookKind::Filter, hook, callback, priority, state_kind)
            .await
    }

    /// Threads `value` through every filter of `hook` in priority order.
    ///
    /// Each callback receives the current value followed by `args`. With no
    /// filters registered the value comes back unchanged.
    pub async fn apply_filters(&self, hook: &str, value: Value, args: &[Value]) -> HookResult<Value> {
        let registrations = self.registry.get(HookKind::Filter, hook).await?;
        if registrations.is_empty() {
            return Ok(value);
        }

        debug!(hook, filters = registrations.len(), "Applying filters");

        let stages: Vec<Box<dyn FilterStage>> = registrations
            .into_iter()
            .map(|registration| {
                Box::new(RunnerStage::new(self.runner.clone(), registration)) as Box<dyn FilterStage>
            })
            .collect();

        Pipeline::send(value)
            .with(args.to_vec())
            .through(stages)
            .then_return()
            .await
    }

    /// Removes the filter registered with this callback at this priority.
    pub async fn remove_filter(&self, hook: &str, callback: &Callback, priority: i32) -> HookResult<()> {
        self.remove(HookKind::Filter, hook, callback, priority).await
    }

    /// Removes every filter of `hook`, or only those at `priority`.
    pub async fn remove_all_filters(&self, hook: &str, priority: Option<i32>) -> HookResult<()> {
        self.registry.clear(HookKind::Filter, hook, priority).await
    }

    /// Whether `hook` has any filter.
    pub async fn has_filter(&self, hook: &str) -> HookResult<bool> {
        Ok(!self.registry.get(HookKind::Filter, hook).await?.is_empty())
    }

    // ── Actions ───────────────────────────────────────────

    /// Registers an action callback.
    pub async fn add_action(
        &self,
        hook: &str,
        callback: &Callback,
        priority: i32,
        state_kind: StateKind,
    ) -> HookResult<()> {
        self.add(HookKind::Action, hook, callback, priority, state_kind)
            .await
    }

    /// Hands every action of `hook` to the dispatcher in priority order.
    ///
    /// The first registration that fails stops the rest.
    pub async fn do_action(&self, hook: &str, args: &[Value]) -> HookResult<()> {
        let registrations = self.registry.get(HookKind::Action, hook).await?;
        if registrations.is_empty() {
            return Ok(());
        }

        debug!(hook, actions = registrations.len(), dispatcher = self.dispatcher.mode(), "Doing action");

        for registration in registrations {
            self.dispatcher.dispatch(hook, registration, args).await?;
        }
        Ok(())
    }

    /// Removes the action registered with this callback at this priority.
    pub async fn remove_action(&self, hook: &str, callback: &Callback, priority: i32) -> HookResult<()> {
        self.remove(HookKind::Action, hook, callback, priority).await
    }

    /// Removes every action of `hook`, or only those at `priority`.
    pub async fn remove_all_actions(&self, hook: &str, priority: Option<i32>) -> HookResult<()> {
        self.registry.clear(HookKind::Action, hook, priority).await
    }

    /// Whether `hook` has any action.
    pub async fn has_action(&self, hook: &str) -> HookResult<bool> {
        Ok(!self.registry.get(HookKind::Action, hook).await?.is_empty())
    }

    /// Runs one action registration right here. Dispatchers and background
    /// workers use this to execute what they were handed.
    pub async fn execute_dispatched_action(
        &self,
        registration: &HookRegistration,
        args: &[Value],
    ) -> HookResult<Value> {
        self.runner.run_registration(registration, args).await
    }

    // ── Flow boundaries ───────────────────────────────────

    /// Drops every scoped receiver. Call at the end of each unit of work.
    pub fn flush_cache(&self) {
        let pooled = self.runner.pool().len();
        self.runner.pool().clear();
        debug!(pooled, "Scoped hook instances flushed");
    }

    /// Removes every persisted shared state record.
    pub async fn flush_state(&self) -> HookResult<()> {
        self.runner.bridge().flush().await?;
        info!("Shared hook state flushed");
        Ok(())
    }

    async fn add(
        &self,
        kind: HookKind,
        hook: &str,
        callback: &Callback,
        priority: i32,
        state_kind: StateKind,
    ) -> HookResult<()> {
        let descriptor = codec::encode(callback)?;
        self.registry
            .set(HookRegistration::new(kind, hook, descriptor, priority, state_kind))
            .await?;
        debug!(kind = %kind, hook, priority, state_kind = %state_kind, "Hook added");
        Ok(())
    }

    async fn remove(
        &self,
        kind: HookKind,
        hook: &str,
        callback: &Callback,
        priority: i32,
    ) -> HookResult<()> {
        let descriptor = codec::encode(callback)?;
        self.registry.remove(kind, hook, &descriptor, priority).await
    }
}
