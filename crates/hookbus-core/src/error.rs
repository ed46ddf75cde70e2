//! Unified error types for the hook engine.
//!
//! Every backend, the runner, and the manager map their failures into
//! [`HookError`] so callers can match on [`ErrorKind`] and propagate with `?`.

use std::fmt;
use thiserror::Error;

/// Error category used across the whole workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// An encoded callback exceeds the descriptor size budget.
    Oversize,
    /// A descriptor could not be classified or its payload is corrupt.
    MalformedDescriptor,
    /// A named type, method, closure, or function could not be resolved.
    UnresolvedTarget,
    /// A shared-state lock was not acquired within its timeout.
    LockTimeout,
    /// The invoked callback itself failed.
    Callback,
    /// A fixed-capacity table is full or a field exceeds its column width.
    Capacity,
    /// The external cache service failed.
    Cache,
    /// A filesystem operation failed.
    Storage,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// A configuration error occurred.
    Configuration,
    /// An internal error occurred.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Oversize => write!(f, "OVERSIZE"),
            Self::MalformedDescriptor => write!(f, "MALFORMED_DESCRIPTOR"),
            Self::UnresolvedTarget => write!(f, "UNRESOLVED_TARGET"),
            Self::LockTimeout => write!(f, "LOCK_TIMEOUT"),
            Self::Callback => write!(f, "CALLBACK"),
            Self::Capacity => write!(f, "CAPACITY"),
            Self::Cache => write!(f, "CACHE"),
            Self::Storage => write!(f, "STORAGE"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified error used throughout hookbus.
///
/// Backend-specific errors are mapped into `HookError` through `From` impls
/// or explicit `.map_err()` calls, keeping a single error type at every
/// public boundary.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct HookError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl HookError {
    /// Create a new error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an oversize error for a descriptor of `len` bytes.
    pub fn oversize(len: usize, max: usize) -> Self {
        Self::new(
            ErrorKind::Oversize,
            format!("Hook callback is {len} bytes, exceeding the maximum of {max} bytes"),
        )
    }

    /// Create a malformed-descriptor error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedDescriptor, message)
    }

    /// Create an unresolved-target error.
    pub fn unresolved(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnresolvedTarget, message)
    }

    /// Create a lock-timeout error for a state key.
    pub fn lock_timeout(key: &str) -> Self {
        Self::new(
            ErrorKind::LockTimeout,
            format!("Timed out acquiring shared state lock for '{key}'"),
        )
    }

    /// Create an error raised by a callback body.
    pub fn callback(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Callback, message)
    }

    /// Create a capacity error.
    pub fn capacity(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Capacity, message)
    }

    /// Create a cache error.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cache, message)
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Returns `true` if this error is of the given kind.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl Clone for HookError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for HookError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for HookError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Storage, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for HookError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
