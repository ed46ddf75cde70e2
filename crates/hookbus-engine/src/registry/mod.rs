//! Hook registry backends.
//!
//! | Backend  | Visibility                | Notes                                  |
//! |----------|---------------------------|----------------------------------------|
//! | `memory` | one process               | default                                |
//! | `shared` | every clone in a process  | fixed rows and column widths           |
//! | `cache`  | every process on a cache  | read-modify-write, register at boot    |
//! | `file`   | every process on a host   | JSON table, atomic replace on mutation |

pub mod cache;
pub mod compiled_file;
pub mod memory;
pub mod shared_table;

use std::sync::Arc;

use tracing::info;

use hookbus_cache::CacheManager;
use hookbus_core::config::registry::RegistryConfig;
use hookbus_core::error::HookError;
use hookbus_core::result::HookResult;
use hookbus_core::traits::registry::HookRegistry;

pub use self::cache::CacheRegistry;
pub use self::compiled_file::CompiledFileRegistry;
pub use self::memory::MemoryRegistry;
pub use self::shared_table::SharedTableRegistry;

/// Builds the registry named by `config.backend`.
///
/// The `cache` backend needs a cache manager; the others ignore it.
pub async fn from_config(
    config: &RegistryConfig,
    cache: Option<Arc<CacheManager>>,
) -> HookResult<Arc<dyn HookRegistry>> {
    let registry: Arc<dyn HookRegistry> = match config.backend.as_str() {
        "memory" => Arc::new(MemoryRegistry::new()),
        "shared" => Arc::new(SharedTableRegistry::new(config.shared.clone())),
        "cache" => {
            let cache = cache.ok_or_else(|| {
                HookError::configuration("Registry backend 'cache' requires a cache manager")
            })?;
            Arc::new(CacheRegistry::new(cache))
        }
        "file" => Arc::new(CompiledFileRegistry::open(&config.file.path).await?),
        other => {
            return Err(HookError::configuration(format!(
                "Unknown registry backend: '{other}'. Supported: memory, shared, cache, file"
            )));
        }
    };

    info!(backend = registry.backend(), "Hook registry initialized");
    Ok(registry)
}
