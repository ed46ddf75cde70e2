//! Traits implemented by hook receivers.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use hookbus_core::result::HookResult;
use hookbus_core::types::hook::StateData;

/// A receiver whose methods can be invoked by name.
///
/// This is what the runner calls for `Object:` and `Type@method`
/// descriptors. Unknown methods should fail with an `UnresolvedTarget` error.
#[async_trait]
pub trait Hookable: Send + Sync + std::fmt::Debug {
    /// Invokes `method` with `args` and returns its value.
    async fn call(&mut self, method: &str, args: &[Value]) -> HookResult<Value>;

    /// Exposes the stateful capability, if this receiver has one.
    fn stateful(&mut self) -> Option<&mut dyn Stateful> {
        None
    }
}

/// A receiver whose state can be persisted and shared across flows.
pub trait Stateful: Send {
    /// Loads previously persisted state. Receives an empty map on first use.
    fn hydrate(&mut self, state: StateData);

    /// Extracts the state to persist.
    fn extract(&self) -> StateData;
}

/// A receiver that can be embedded in an `Object:` descriptor and
/// reconstructed by the resolver.
pub trait HookTarget: Hookable + Serialize + DeserializeOwned + 'static {
    /// Stable type identifier used in descriptors and by the resolver.
    const TYPE_NAME: &'static str;
}
