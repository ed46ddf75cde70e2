//! Shared value types used by every hookbus crate.

pub mod hook;

pub use hook::{HookKind, HookRegistration, RegistrationEntry, StateData, StateKind};
