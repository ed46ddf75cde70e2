//! State driver trait: key-addressed state plus per-key mutual exclusion.

use async_trait::async_trait;

use crate::result::HookResult;
use crate::types::hook::StateData;

/// Store for persisted callback state.
///
/// Records never expire on their own; `flush` clears them all. `lock`
/// returns `false` when the lock could not be acquired within the driver's
/// configured timeout.
#[async_trait]
pub trait StateDriver: Send + Sync + std::fmt::Debug + 'static {
    /// Short driver name used in logs (`memory`, `shared`, `cache`).
    fn driver(&self) -> &'static str;

    /// Fetch the state for `key`. Absent keys yield an empty map.
    async fn get(&self, key: &str) -> HookResult<StateData>;

    /// Replace the state for `key`.
    async fn set(&self, key: &str, data: &StateData) -> HookResult<()>;

    /// Acquire the lock for `key`, waiting up to the configured timeout.
    async fn lock(&self, key: &str) -> HookResult<bool>;

    /// Release the lock for `key`. Releasing an unheld lock is a no-op.
    async fn unlock(&self, key: &str) -> HookResult<()>;

    /// Remove every state record.
    async fn flush(&self) -> HookResult<()>;
}
