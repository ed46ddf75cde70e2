//! Action dispatch: inline or handed off to background workers.
//!
//! The dispatcher is chosen once at process start. Background dispatchers
//! live in `hookbus-worker`.

pub mod sync;

use async_trait::async_trait;
use serde_json::Value;

use hookbus_core::result::HookResult;
use hookbus_core::types::hook::HookRegistration;

pub use self::sync::SyncDispatcher;

/// Decides where a matched action registration runs.
#[async_trait]
pub trait ActionDispatcher: Send + Sync + std::fmt::Debug + 'static {
    /// Short mode name used in logs (`sync`, `queue`).
    fn mode(&self) -> &'static str;

    /// Runs or schedules one registration of `hook`.
    ///
    /// Inline dispatchers propagate the callback's error; background
    /// dispatchers return once the job is accepted.
    async fn dispatch(
        &self,
        hook: &str,
        registration: HookRegistration,
        args: &[Value],
    ) -> HookResult<()>;
}
