//! Hook dispatch engine for hookbus.
//!
//! This crate provides:
//! - A callback codec turning callbacks into size-bounded descriptors
//! - A resolver/container for the types, closures, and functions descriptors name
//! - Registry backends (memory, shared table, external cache, compiled file)
//! - State drivers and the bridge that hydrates stateful receivers
//! - A runner with guaranteed lock release, a filter pipeline, and inline dispatch
//! - The [`HookManager`] API: `add_filter`, `apply_filters`, `add_action`, `do_action`, ...

pub mod codec;
pub mod dispatch;
pub mod manager;
pub mod pipeline;
pub mod pool;
pub mod registry;
pub mod resolver;
pub mod runner;
pub mod state;
pub mod target;

pub use codec::{Callback, Invocation};
pub use dispatch::{ActionDispatcher, SyncDispatcher};
pub use manager::{DEFAULT_PRIORITY, HookManager};
pub use pipeline::{FilterStage, Pipeline};
pub use pool::InstancePool;
pub use resolver::{Container, Resolver};
pub use runner::HookRunner;
pub use state::StateBridge;
pub use target::{HookTarget, Hookable, Stateful};
