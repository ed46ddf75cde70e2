//! Hook kinds, state kinds, and the registration record.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HookError;

/// Persisted state of a stateful callback.
///
/// An empty map is what a callback sees before anything was persisted.
pub type StateData = serde_json::Map<String, serde_json::Value>;

/// The two kinds of hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookKind {
    /// Fired for side effects; callbacks return nothing meaningful.
    Action,
    /// Fired to transform a value; callbacks return the next value.
    Filter,
}

impl HookKind {
    /// Returns the string name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Action => "action",
            Self::Filter => "filter",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HookKind {
    type Err = HookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "action" => Ok(Self::Action),
            "filter" => Ok(Self::Filter),
            other => Err(HookError::configuration(format!(
                "Unknown hook kind: '{other}'. Supported: action, filter"
            ))),
        }
    }
}

/// How a callback's instance and state are managed between invocations.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    /// Fresh instance per execution, dropped right after.
    #[default]
    Volatile,
    /// Instance pooled within one flow and released by `flush_cache`.
    Scoped,
    /// State persisted through the state driver under a per-key lock.
    Shared,
}

impl StateKind {
    /// Returns the string name of this state kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Volatile => "volatile",
            Self::Scoped => "scoped",
            Self::Shared => "shared",
        }
    }
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StateKind {
    type Err = HookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "volatile" => Ok(Self::Volatile),
            "scoped" => Ok(Self::Scoped),
            "shared" => Ok(Self::Shared),
            other => Err(HookError::configuration(format!(
                "Unknown state kind: '{other}'. Supported: volatile, scoped, shared"
            ))),
        }
    }
}

/// One registration as stored in a `(kind, name)` list.
///
/// This is the persisted row shape used by the cache and file registries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationEntry {
    /// Encoded callback.
    pub descriptor: String,
    /// Lower runs first.
    pub priority: i32,
    /// Instance/state management mode.
    #[serde(default)]
    pub state_kind: StateKind,
}

/// A full hook registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookRegistration {
    /// Action or filter.
    pub kind: HookKind,
    /// Hook name, e.g. `the_title`.
    pub name: String,
    /// Encoded callback.
    pub descriptor: String,
    /// Lower runs first.
    pub priority: i32,
    /// Instance/state management mode.
    pub state_kind: StateKind,
}

impl HookRegistration {
    /// Creates a registration.
    pub fn new(
        kind: HookKind,
        name: impl Into<String>,
        descriptor: impl Into<String>,
        priority: i32,
        state_kind: StateKind,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            descriptor: descriptor.into(),
            priority,
            state_kind,
        }
    }

    /// Rebuilds a registration from a stored list entry.
    pub fn from_entry(kind: HookKind, name: &str, entry: RegistrationEntry) -> Self {
        Self {
            kind,
            name: name.to_string(),
            descriptor: entry.descriptor,
            priority: entry.priority,
            state_kind: entry.state_kind,
        }
    }

    /// Returns the stored list entry for this registration.
    pub fn to_entry(&self) -> RegistrationEntry {
        RegistrationEntry {
            descriptor: self.descriptor.clone(),
            priority: self.priority,
            state_kind: self.state_kind,
        }
    }

    /// Returns whether this registration matches a removal key.
    pub fn matches(&self, descriptor: &str, priority: i32) -> bool {
        self.descriptor == descriptor && self.priority == priority
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_kind_serde_names() {
        let json = serde_json::to_string(&StateKind::Shared).unwrap();
        assert_eq!(json, "\"shared\"");
        let parsed: StateKind = serde_json::from_str("\"scoped\"").unwrap();
        assert_eq!(parsed, StateKind::Scoped);
    }

    #[test]
    fn test_entry_defaults_to_volatile() {
        let entry: RegistrationEntry =
            serde_json::from_str(r#"{"descriptor":"log","priority":10}"#).unwrap();
        assert_eq!(entry.state_kind, StateKind::Volatile);
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("filter".parse::<HookKind>().unwrap(), HookKind::Filter);
        assert!("hook".parse::<HookKind>().is_err());
    }
}
