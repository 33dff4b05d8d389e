//! Common Utilities
//!
//! Shared error types, result aliases, and path helpers used across the core.

pub mod error;
pub mod paths;
pub mod result;

pub use error::{
    ApplyStage, BoxError, ConfigError, ContainerError, ManifestError, OverlayError, PatchError,
};
pub use paths::{is_hidden, module_name, relative_to, strip_prefix_segment, with_suffix};
pub use result::PatchResult;
