//! State drivers and the bridge that hydrates stateful receivers.

pub mod bridge;
pub mod cache;
pub mod lock;
pub mod memory;
pub mod shared;

use std::sync::Arc;

use tracing::info;

use hookbus_cache::CacheManager;
use hookbus_core::config::state::StateConfig;
use hookbus_core::error::HookError;
use hookbus_core::result::HookResult;
use hookbus_core::traits::state::StateDriver;

pub use self::bridge::StateBridge;
pub use self::cache::{CacheStateDriver, LockSettings};
pub use self::memory::MemoryStateDriver;
pub use self::shared::SharedStateDriver;

/// Builds the state driver named by `config.driver`.
pub fn from_config(
    config: &StateConfig,
    cache: Option<Arc<CacheManager>>,
) -> HookResult<Arc<dyn StateDriver>> {
    let driver: Arc<dyn StateDriver> = match config.driver.as_str() {
        "memory" => Arc::new(MemoryStateDriver::with_lock_timeout(config.lock_timeout())),
        "shared" => Arc::new(SharedStateDriver::new(
            config.shared.clone(),
            config.lock_timeout(),
        )),
        "cache" => {
            let cache = cache.ok_or_else(|| {
                HookError::configuration("State driver 'cache' requires a cache manager")
            })?;
            Arc::new(CacheStateDriver::new(cache, LockSettings::from(config)))
        }
        other => {
            return Err(HookError::configuration(format!(
                "Unknown state driver: '{other}'. Supported: memory, shared, cache"
            )));
        }
    };

    info!(
        driver = driver.driver(),
        lock_timeout_ms = config.lock_timeout_ms,
        "State driver initialized"
    );
    Ok(driver)
}
