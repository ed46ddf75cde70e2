//! Hook registry trait: pluggable storage for ordered registrations.

use async_trait::async_trait;

use crate::result::HookResult;
use crate::types::hook::{HookKind, HookRegistration};

/// Storage for `(kind, name) -> ordered registrations`.
///
/// Every backend returns lists sorted by priority ascending, with equal
/// priorities kept in registration order. Looking up an unknown hook yields
/// an empty list, and removing or clearing nothing is not an error.
#[async_trait]
pub trait HookRegistry: Send + Sync + std::fmt::Debug + 'static {
    /// Short backend name used in logs (`memory`, `shared`, `cache`, `file`).
    fn backend(&self) -> &'static str;

    /// Store a registration.
    async fn set(&self, registration: HookRegistration) -> HookResult<()>;

    /// Return the ordered registrations for a hook.
    async fn get(&self, kind: HookKind, name: &str) -> HookResult<Vec<HookRegistration>>;

    /// Remove every registration matching `(descriptor, priority)`.
    async fn remove(
        &self,
        kind: HookKind,
        name: &str,
        descriptor: &str,
        priority: i32,
    ) -> HookResult<()>;

    /// Remove all registrations for a hook, or only those at `priority`.
    async fn clear(&self, kind: HookKind, name: &str, priority: Option<i32>) -> HookResult<()>;
}

/// Stable sort by priority. Equal priorities keep their relative order.
pub fn sort_by_priority(registrations: &mut [HookRegistration]) {
    registrations.sort_by_key(|r| r.priority);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::hook::StateKind;

    #[test]
    fn test_sort_is_stable() {
        let mut list = vec![
            HookRegistration::new(HookKind::Filter, "t", "b", 10, StateKind::Volatile),
            HookRegistration::new(HookKind::Filter, "t", "a", 5, StateKind::Volatile),
            HookRegistration::new(HookKind::Filter, "t", "c", 10, StateKind::Volatile),
        ];
        sort_by_priority(&mut list);
        let order: Vec<_> = list.iter().map(|r| r.descriptor.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }
}
