//! Common Result Type
//!
//! Type alias for patch registry results.

use super::error::PatchError;

/// Result type for registry and plugin operations
///
/// Uses PatchError so hard failures (registration after apply, failed
/// application) can never be confused with soft ones.
pub type PatchResult<T> = Result<T, PatchError>;
