//! Action dispatcher configuration.

use serde::{Deserialize, Serialize};

/// Selects inline or background execution of actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Dispatch mode: `"sync"` or `"queue"`.
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Capacity of the background channel. A full channel degrades to inline execution.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Number of actions the background worker executes concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            queue_capacity: default_queue_capacity(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_mode() -> String {
    "sync".to_string()
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_concurrency() -> usize {
    4
}
