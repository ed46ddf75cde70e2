//! # hookbus-core
//!
//! Core crate for hookbus. Contains the backend traits (hook registry,
//! state driver, cache provider), configuration schemas, the hook
//! registration types, and the unified error system.
//!
//! This crate has **no** internal dependencies on other hookbus crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::HookError;
pub use result::HookResult;
pub use types::hook::{HookKind, HookRegistration, RegistrationEntry, StateData, StateKind};
