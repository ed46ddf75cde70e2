//! Flow-local pool of live receivers for scoped callbacks.

use dashmap::DashMap;

use crate::target::Hookable;

/// Receivers kept alive between calls within one flow.
///
/// A receiver is taken out for the duration of a call and put back after,
/// so concurrent calls on the same key never share one instance; the
/// second caller gets a fresh one. [`clear`](Self::clear) ends the flow.
#[derive(Debug, Default)]
pub struct InstancePool {
    instances: DashMap<String, Box<dyn Hookable>>,
}

impl InstancePool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns the pooled receiver for `key`.
    pub fn take(&self, key: &str) -> Option<Box<dyn Hookable>> {
        self.instances.remove(key).map(|(_, instance)| instance)
    }

    /// Returns a receiver to the pool.
    pub fn put(&self, key: String, instance: Box<dyn Hookable>) {
        self.instances.insert(key, instance);
    }

    /// Drops every pooled receiver.
    pub fn clear(&self) {
        self.instances.clear();
    }

    /// Number of pooled receivers.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Returns `true` if nothing is pooled.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
