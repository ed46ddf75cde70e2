//! Convenience result type alias for hookbus.

use crate::error::HookError;

/// A specialized `Result` type for hook engine operations.
///
/// Every crate in the workspace returns this instead of spelling out
/// `Result<T, HookError>`.
pub type HookResult<T> = Result<T, HookError>;
