//! Compiled-file hook registry for hosts where the filesystem is the only
//! thing processes share.
//!
//! The whole table is kept in memory and rewritten to disk on every
//! mutation as `{kind: {name: [entry]}}` JSON. Writes go to a temporary
//! sibling file that is then renamed over the target, so a crash mid-write
//! never leaves a truncated table behind. A mutation only reaches the
//! in-memory table once its write has succeeded.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};

use hookbus_core::error::{ErrorKind, HookError};
use hookbus_core::result::HookResult;
use hookbus_core::traits::registry::HookRegistry;
use hookbus_core::types::hook::{HookKind, HookRegistration, RegistrationEntry};

/// Persisted layout.
pub type CompiledTable = BTreeMap<HookKind, BTreeMap<String, Vec<RegistrationEntry>>>;

/// Distinguishes temp files of concurrent writers within one process.
static TEMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Registry persisted to a single JSON file.
///
/// Each instance rewrites the whole file from its own copy of the table.
/// Instances in other processes, or a second instance on the same path, do
/// not see each other's writes until [`reload`](Self::reload), and the last
/// writer's table replaces the file.
#[derive(Debug)]
pub struct CompiledFileRegistry {
    /// Target file.
    path: PathBuf,
    /// In-memory copy of the table. The write lock is held across the file
    /// write so mutations land on disk in order.
    hooks: RwLock<CompiledTable>,
}

impl CompiledFileRegistry {
    /// Opens the registry at `path`, loading the table if the file exists.
    pub async fn open(path: impl Into<PathBuf>) -> HookResult<Self> {
        let path = path.into();
        let hooks = load_table(&path).await?;

        info!(
            path = %path.display(),
            hooks = hooks.values().map(BTreeMap::len).sum::<usize>(),
            "Opened compiled hook registry"
        );

        Ok(Self {
            path,
            hooks: RwLock::new(hooks),
        })
    }

    /// Path of the compiled table.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-reads the table from disk, picking up writes from other processes.
    pub async fn reload(&self) -> HookResult<()> {
        let table = load_table(&self.path).await?;
        *self.hooks.write().await = table;
        Ok(())
    }

    /// Returns a copy of the whole table.
    pub async fn snapshot(&self) -> CompiledTable {
        self.hooks.read().await.clone()
    }

    async fn persist(&self, table: &CompiledTable) -> HookResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| {
                HookError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create registry directory: {}", parent.display()),
                    e,
                )
            })?;
        }

        let json = serde_json::to_vec_pretty(table)?;
        let tmp_path = temp_path(&self.path);

        fs::write(&tmp_path, &json).await.map_err(|e| {
            HookError::with_source(
                ErrorKind::Storage,
                format!("Failed to write registry file: {}", tmp_path.display()),
                e,
            )
        })?;

        if let Err(e) = fs::rename(&tmp_path, &self.path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(HookError::with_source(
                ErrorKind::Storage,
                format!("Failed to replace registry file: {}", self.path.display()),
                e,
            ));
        }

        debug!(path = %self.path.display(), bytes = json.len(), "Compiled hook registry written");
        Ok(())
    }
}

#[async_trait]
impl HookRegistry for CompiledFileRegistry {
    fn backend(&self) -> &'static str {
        "file"
    }

    async fn set(&self, registration: HookRegistration) -> HookResult<()> {
        let mut hooks = self.hooks.write().await;
        let mut next = hooks.clone();
        let entries = next
            .entry(registration.kind)
            .or_default()
            .entry(registration.name.clone())
            .or_default();

        // Repeated boots re-register the same hooks; keep the file from growing.
        if let Some(existing) = entries
            .iter_mut()
            .find(|e| e.descriptor == registration.descriptor && e.priority == registration.priority)
        {
            if existing.state_kind == registration.state_kind {
                return Ok(());
            }
            existing.state_kind = registration.state_kind;
        } else {
            entries.push(registration.to_entry());
            entries.sort_by_key(|e| e.priority);
        }

        self.persist(&next).await?;
        *hooks = next;
        Ok(())
    }

    async fn get(&self, kind: HookKind, name: &str) -> HookResult<Vec<HookRegistration>> {
        let hooks = self.hooks.read().await;
        Ok(hooks
            .get(&kind)
            .and_then(|names| names.get(name))
            .map(|entries| {
                entries
                    .iter()
                    .cloned()
                    .map(|entry| HookRegistration::from_entry(kind, name, entry))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn remove(
        &self,
        kind: HookKind,
        name: &str,
        descriptor: &str,
        priority: i32,
    ) -> HookResult<()> {
        let mut hooks = self.hooks.write().await;
        let mut next = hooks.clone();
        let changed = retain_entries(&mut next, kind, name, |e| {
            !(e.descriptor == descriptor && e.priority == priority)
        });
        if changed {
            self.persist(&next).await?;
            *hooks = next;
        }
        Ok(())
    }

    async fn clear(&self, kind: HookKind, name: &str, priority: Option<i32>) -> HookResult<()> {
        let mut hooks = self.hooks.write().await;
        let mut next = hooks.clone();
        let changed = retain_entries(&mut next, kind, name, |e| {
            priority.is_some_and(|p| e.priority != p)
        });
        if changed {
            self.persist(&next).await?;
            *hooks = next;
        }
        Ok(())
    }
}

/// Applies `keep` to one hook list, dropping the list when it empties.
/// Returns whether anything was removed.
fn retain_entries(
    table: &mut CompiledTable,
    kind: HookKind,
    name: &str,
    keep: impl Fn(&RegistrationEntry) -> bool,
) -> bool {
    let Some(names) = table.get_mut(&kind) else {
        return false;
    };
    let Some(entries) = names.get_mut(name) else {
        return false;
    };

    let before = entries.len();
    entries.retain(|e| keep(e));
    let changed = entries.len() != before;

    if entries.is_empty() {
        names.remove(name);
    }
    if names.is_empty() {
        table.remove(&kind);
    }
    changed
}

async fn load_table(path: &Path) -> HookResult<CompiledTable> {
    match fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
            HookError::with_source(
                ErrorKind::Serialization,
                format!("Compiled hook registry is corrupt: {}", path.display()),
                e,
            )
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CompiledTable::new()),
        Err(e) => Err(HookError::with_source(
            ErrorKind::Storage,
            format!("Failed to read registry file: {}", path.display()),
            e,
        )),
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "hooks.json".to_string());
    let seq = TEMP_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(".{file_name}.{}.{seq}.tmp", std::process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookbus_core::types::hook::StateKind;

    fn reg(descriptor: &str, priority: i32) -> HookRegistration {
        HookRegistration::new(HookKind::Filter, "the_title", descriptor, priority, StateKind::Volatile)
    }

    #[tokio::test]
    async fn test_table_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("framework/hooks.json");

        let registry = CompiledFileRegistry::open(&path).await.unwrap();
        registry.set(reg("b", 20)).await.unwrap();
        registry.set(reg("a", 5)).await.unwrap();

        let reopened = CompiledFileRegistry::open(&path).await.unwrap();
        let order: Vec<_> = reopened
            .get(HookKind::Filter, "the_title")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.descriptor)
            .collect();
        assert_eq!(order, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_repeated_boot_does_not_grow_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hooks.json");

        for _ in 0..3 {
            let registry = CompiledFileRegistry::open(&path).await.unwrap();
            registry.set(reg("a", 10)).await.unwrap();
            registry.set(reg("b", 10)).await.unwrap();
        }

        let registry = CompiledFileRegistry::open(&path).await.unwrap();
        assert_eq!(registry.get(HookKind::Filter, "the_title").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_write_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hooks.json");
        let registry = CompiledFileRegistry::open(&path).await.unwrap();
        registry.set(reg("a", 10)).await.unwrap();
        registry.remove(HookKind::Filter, "the_title", "a", 10).await.unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["hooks.json".to_string()]);

        let table: CompiledTable =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_table_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hooks.json");
        let registry = CompiledFileRegistry::open(&path).await.unwrap();
        registry.set(reg("a", 10)).await.unwrap();

        // A directory in place of the file makes the rename fail.
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let err = registry.set(reg("b", 10)).await.unwrap_err();
        assert!(err.is(ErrorKind::Storage));
        let err = registry
            .remove(HookKind::Filter, "the_title", "a", 10)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Storage));
        let err = registry
            .clear(HookKind::Filter, "the_title", None)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Storage));

        let descriptors: Vec<_> = registry
            .get(HookKind::Filter, "the_title")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.descriptor)
            .collect();
        assert_eq!(descriptors, vec!["a"]);
    }

    #[tokio::test]
    async fn test_instances_on_one_path_write_concurrently() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hooks.json");
        let first = std::sync::Arc::new(CompiledFileRegistry::open(&path).await.unwrap());
        let second = std::sync::Arc::new(CompiledFileRegistry::open(&path).await.unwrap());

        let mut handles = Vec::new();
        for i in 0..8 {
            let registry = if i % 2 == 0 { first.clone() } else { second.clone() };
            handles.push(tokio::spawn(async move {
                registry.set(reg(&format!("cb{i}"), i)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // Whichever instance wrote last owns the file, and it parses.
        let reopened = CompiledFileRegistry::open(&path).await.unwrap();
        assert_eq!(reopened.get(HookKind::Filter, "the_title").await.unwrap().len(), 4);
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_temp_paths_are_unique() {
        let path = Path::new("/tmp/framework/hooks.json");
        assert_ne!(temp_path(path), temp_path(path));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hooks.json");
        std::fs::write(&path, b"{not json").unwrap();
        let err = CompiledFileRegistry::open(&path).await.unwrap_err();
        assert!(err.is(ErrorKind::Serialization));
    }
}
