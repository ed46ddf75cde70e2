//! State driver configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// State driver selection and lock tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// Driver type: `"memory"`, `"shared"`, or `"cache"`.
    #[serde(default = "default_driver")]
    pub driver: String,
    /// How long `lock` waits before giving up, in milliseconds.
    #[serde(default = "default_lock_timeout")]
    pub lock_timeout_ms: u64,
    /// Poll interval while waiting on a cache lock, in milliseconds.
    #[serde(default = "default_poll_interval")]
    pub lock_poll_interval_ms: u64,
    /// TTL of a cache lock key, releasing locks held by crashed processes.
    #[serde(default = "default_lock_ttl")]
    pub lock_ttl_seconds: u64,
    /// Shared-memory table settings.
    #[serde(default)]
    pub shared: SharedStateConfig,
}

impl StateConfig {
    /// Lock acquisition timeout.
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Poll interval for cache locks.
    pub fn lock_poll_interval(&self) -> Duration {
        Duration::from_millis(self.lock_poll_interval_ms)
    }

    /// TTL of cache lock keys.
    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_seconds)
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            lock_timeout_ms: default_lock_timeout(),
            lock_poll_interval_ms: default_poll_interval(),
            lock_ttl_seconds: default_lock_ttl(),
            shared: SharedStateConfig::default(),
        }
    }
}

/// Fixed-capacity shared state table layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedStateConfig {
    /// Maximum number of state records.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Width of the serialized data column in bytes.
    #[serde(default = "default_data_width")]
    pub data_width: usize,
}

impl Default for SharedStateConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            data_width: default_data_width(),
        }
    }
}

fn default_driver() -> String {
    "memory".to_string()
}

fn default_lock_timeout() -> u64 {
    2000
}

fn default_poll_interval() -> u64 {
    1
}

fn default_lock_ttl() -> u64 {
    10
}

fn default_capacity() -> usize {
    1024
}

fn default_data_width() -> usize {
    4096
}
