//! Cache key builders for every hookbus cache entry.
//!
//! Keys are relative; the Redis provider adds its configured prefix.

use hookbus_core::types::hook::HookKind;

// ── Registry keys ──────────────────────────────────────────

/// Cache key holding the ordered registration list of one hook.
pub fn hook_list(kind: HookKind, name: &str) -> String {
    format!("hooks:{kind}:{name}")
}

// ── State keys ─────────────────────────────────────────────

/// Cache key holding one state record.
pub fn state_record(state_key: &str) -> String {
    format!("state:{state_key}")
}

/// Pattern matching every state record.
pub fn state_pattern() -> String {
    "state:*".to_string()
}

/// Cache key of the mutex guarding one state record.
pub fn state_lock(state_key: &str) -> String {
    format!("lock:{state_key}")
}
