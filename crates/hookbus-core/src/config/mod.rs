//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section. Every section has defaults, so an empty file (or no file at all)
//! yields a single-process setup: memory registry, memory state, synchronous
//! dispatch.

pub mod cache;
pub mod dispatcher;
pub mod logging;
pub mod registry;
pub mod state;

use serde::{Deserialize, Serialize};

use self::cache::CacheConfig;
use self::dispatcher::DispatcherConfig;
use self::logging::LoggingConfig;
use self::registry::RegistryConfig;
use self::state::StateConfig;

use crate::error::HookError;

/// Root application configuration.
///
/// Top-level deserialization target for the merged TOML configuration files
/// (default.toml + environment overlay + `HOOKBUS__*` variables).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Hook registry backend settings.
    #[serde(default)]
    pub registry: RegistryConfig,
    /// State driver settings.
    #[serde(default)]
    pub state: StateConfig,
    /// Action dispatcher settings.
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    /// External cache settings (used by the `cache` registry and state driver).
    #[serde(default)]
    pub cache: CacheConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration for an environment.
    ///
    /// Merges `config/default` with `config/{env}` and environment variables
    /// prefixed with `HOOKBUS__` (e.g. `HOOKBUS__REGISTRY__BACKEND=file`).
    pub fn load(env: &str) -> Result<Self, HookError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(Self::environment())
            .build()
            .map_err(|e| HookError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| HookError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Load configuration from an explicit file path plus environment variables.
    pub fn load_file(path: &str) -> Result<Self, HookError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(Self::environment())
            .build()
            .map_err(|e| HookError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| HookError::configuration(format!("Failed to deserialize config: {e}")))
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix("HOOKBUS")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
    }
}
