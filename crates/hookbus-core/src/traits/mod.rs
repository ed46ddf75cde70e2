//! Backend traits implemented by the cache, registry, and state crates.

pub mod cache;
pub mod registry;
pub mod state;

pub use cache::CacheProvider;
pub use registry::HookRegistry;
pub use state::StateDriver;
