//! Common Error Types
//!
//! One error enum per concern. Soft failures (missing manifest, resolution
//! misses, validation mismatches) are not errors at all; only the hard ones
//! live here.

use std::fmt;
use std::path::PathBuf;

use crate::patches::TargetId;

/// Error type returned by patch factories and container adapters
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors reading or validating an `OverlayConfig`
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid naming convention pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

/// Errors loading a manifest strictly
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Manifest not found: {0:?}")]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid manifest: {0}")]
    Invalid(String),
}

/// Errors raised by a `ServiceContainer`
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("No service registered for {0}")]
    NotFound(TargetId),

    #[error("Container rejected {target}: {reason}")]
    Rejected { target: TargetId, reason: String },
}

/// Which step of applying a patch failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyStage {
    Get,
    Factory,
    Set,
}

impl ApplyStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyStage::Get => "get",
            ApplyStage::Factory => "factory",
            ApplyStage::Set => "set",
        }
    }
}

impl fmt::Display for ApplyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hard failures of the patch registry and plugin lifecycle
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("Cannot register patch for {target}: patches have already been applied")]
    RegistrationAfterApply { target: TargetId },

    #[error("Failed to apply patch for {target} ({stage}): {source}")]
    Apply {
        target: TargetId,
        stage: ApplyStage,
        #[source]
        source: BoxError,
    },

    #[error("Unknown patch module: {0}")]
    UnknownModule(String),

    #[error("Patch module {module} failed to register: {source}")]
    ModuleRegistration {
        module: String,
        #[source]
        source: Box<PatchError>,
    },

    #[error("Module discovery failed: {0}")]
    Discovery(String),
}

impl PatchError {
    /// Target whose application or registration failed, if any
    pub fn target(&self) -> Option<&TargetId> {
        match self {
            PatchError::RegistrationAfterApply { target } | PatchError::Apply { target, .. } => {
                Some(target)
            }
            PatchError::ModuleRegistration { source, .. } => source.target(),
            PatchError::UnknownModule(_) | PatchError::Discovery(_) => None,
        }
    }
}

/// Errors setting up the override watcher
#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    #[error("Failed to create watcher: {0}")]
    Watcher(#[from] notify::Error),

    #[error("Override root does not exist: {0:?}")]
    MissingRoot(PathBuf),
}
