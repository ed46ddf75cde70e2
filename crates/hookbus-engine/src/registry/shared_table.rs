//! Fixed-capacity shared-memory hook table.
//!
//! Every clone of a [`SharedTableRegistry`] points at the same table, so
//! sibling workers in one process see each other's registrations. Columns
//! have fixed widths and the table has a fixed row count; exceeding either
//! fails the write instead of truncating it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use sha2::{Digest, Sha256};
use tracing::debug;

use hookbus_core::config::registry::SharedTableConfig;
use hookbus_core::error::HookError;
use hookbus_core::result::HookResult;
use hookbus_core::traits::registry::HookRegistry;
use hookbus_core::types::hook::{HookKind, HookRegistration, StateKind};

/// One table row.
#[derive(Debug, Clone)]
struct TableRow {
    kind: HookKind,
    name: String,
    descriptor: String,
    priority: i32,
    state_kind: StateKind,
    /// Registration order, used to break priority ties.
    seq: u64,
}

impl TableRow {
    fn to_registration(&self) -> HookRegistration {
        HookRegistration::new(
            self.kind,
            self.name.clone(),
            self.descriptor.clone(),
            self.priority,
            self.state_kind,
        )
    }
}

/// Shared-memory registry keyed by `(kind, name, descriptor, priority)`.
///
/// Registering the same descriptor twice at the same priority updates the
/// existing row and keeps its original position.
#[derive(Debug, Clone)]
pub struct SharedTableRegistry {
    table: Arc<DashMap<String, TableRow>>,
    sequence: Arc<AtomicU64>,
    /// Rows reserved against `layout.capacity`.
    rows: Arc<AtomicUsize>,
    layout: SharedTableConfig,
}

impl SharedTableRegistry {
    /// Creates a table with the given layout.
    pub fn new(layout: SharedTableConfig) -> Self {
        Self {
            table: Arc::new(DashMap::with_capacity(layout.capacity)),
            sequence: Arc::new(AtomicU64::new(0)),
            rows: Arc::new(AtomicUsize::new(0)),
            layout,
        }
    }

    /// Number of occupied rows.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn row_key(kind: HookKind, name: &str, descriptor: &str, priority: i32) -> String {
        let mut hasher = Sha256::new();
        hasher.update(kind.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(name.as_bytes());
        hasher.update([0u8]);
        hasher.update(descriptor.as_bytes());
        hasher.update([0u8]);
        hasher.update(priority.to_be_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn check_widths(&self, registration: &HookRegistration) -> HookResult<()> {
        if registration.name.len() > self.layout.name_width {
            return Err(HookError::capacity(format!(
                "Hook name '{}' is {} bytes, exceeding the table's {}-byte column",
                registration.name,
                registration.name.len(),
                self.layout.name_width
            )));
        }
        if registration.descriptor.len() > self.layout.descriptor_width {
            return Err(HookError::capacity(format!(
                "Descriptor for hook '{}' is {} bytes, exceeding the table's {}-byte column",
                registration.name,
                registration.descriptor.len(),
                self.layout.descriptor_width
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl HookRegistry for SharedTableRegistry {
    fn backend(&self) -> &'static str {
        "shared"
    }

    async fn set(&self, registration: HookRegistration) -> HookResult<()> {
        self.check_widths(&registration)?;

        let key = Self::row_key(
            registration.kind,
            &registration.name,
            &registration.descriptor,
            registration.priority,
        );
        match self.table.entry(key) {
            Entry::Occupied(mut occupied) => {
                occupied.get_mut().state_kind = registration.state_kind;
            }
            Entry::Vacant(vacant) => {
                let capacity = self.layout.capacity;
                let reserved = self
                    .rows
                    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                        (n < capacity).then_some(n + 1)
                    });
                if reserved.is_err() {
                    return Err(HookError::capacity(format!(
                        "Shared hook table is full ({capacity} rows)"
                    )));
                }
                vacant.insert(TableRow {
                    kind: registration.kind,
                    name: registration.name.clone(),
                    descriptor: registration.descriptor,
                    priority: registration.priority,
                    state_kind: registration.state_kind,
                    seq: self.sequence.fetch_add(1, Ordering::SeqCst),
                });
            }
        }

        debug!(
            kind = %registration.kind,
            hook = %registration.name,
            priority = registration.priority,
            "Hook registered in shared table"
        );
        Ok(())
    }

    async fn get(&self, kind: HookKind, name: &str) -> HookResult<Vec<HookRegistration>> {
        let mut rows: Vec<TableRow> = self
            .table
            .iter()
            .filter(|row| row.kind == kind && row.name == name)
            .map(|row| row.value().clone())
            .collect();

        rows.sort_by_key(|row| (row.priority, row.seq));
        Ok(rows.iter().map(TableRow::to_registration).collect())
    }

    async fn remove(
        &self,
        kind: HookKind,
        name: &str,
        descriptor: &str,
        priority: i32,
    ) -> HookResult<()> {
        if self
            .table
            .remove(&Self::row_key(kind, name, descriptor, priority))
            .is_some()
        {
            self.rows.fetch_sub(1, Ordering::AcqRel);
        }
        Ok(())
    }

    async fn clear(&self, kind: HookKind, name: &str, priority: Option<i32>) -> HookResult<()> {
        self.table.retain(|_, row| {
            let matches = row.kind == kind
                && row.name == name
                && priority.is_none_or(|p| row.priority == p);
            if matches {
                self.rows.fetch_sub(1, Ordering::AcqRel);
            }
            !matches
        });
        Ok(())
    }
}
