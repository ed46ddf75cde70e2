//! Hook registry backend configuration.

use serde::{Deserialize, Serialize};

/// Registry backend selection and per-backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Backend type: `"memory"`, `"shared"`, `"cache"`, or `"file"`.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Shared-memory table settings.
    #[serde(default)]
    pub shared: SharedTableConfig,
    /// Compiled-file settings.
    #[serde(default)]
    pub file: FileRegistryConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            shared: SharedTableConfig::default(),
            file: FileRegistryConfig::default(),
        }
    }
}

/// Fixed-capacity shared table layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedTableConfig {
    /// Maximum number of rows.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Width of the hook name column in bytes.
    #[serde(default = "default_name_width")]
    pub name_width: usize,
    /// Width of the descriptor column in bytes.
    #[serde(default = "default_descriptor_width")]
    pub descriptor_width: usize,
}

impl Default for SharedTableConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            name_width: default_name_width(),
            descriptor_width: default_descriptor_width(),
        }
    }
}

/// Compiled-file registry location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRegistryConfig {
    /// Path of the compiled table.
    #[serde(default = "default_path")]
    pub path: String,
}

impl Default for FileRegistryConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
        }
    }
}

fn default_backend() -> String {
    "memory".to_string()
}

fn default_capacity() -> usize {
    2048
}

fn default_name_width() -> usize {
    64
}

fn default_descriptor_width() -> usize {
    8192
}

fn default_path() -> String {
    "storage/framework/hooks.json".to_string()
}
