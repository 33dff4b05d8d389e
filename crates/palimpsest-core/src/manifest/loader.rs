//! Manifest Loader
//!
//! Reads and validates the patch manifest. The manifest is a soft
//! dependency: `load` never fails, it logs and reports "no manifest".

use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use super::types::Manifest;
use crate::common::ManifestError;

/// Maximum manifest size we'll read (1 MB)
const MAX_MANIFEST_SIZE: u64 = 1_000_000;

/// Loads patch manifests from disk
pub struct ManifestStore;

impl ManifestStore {
    /// Load a manifest, returning `None` when it is absent or unreadable
    pub fn load(path: &Path) -> Option<Manifest> {
        match Self::load_strict(path) {
            Ok(manifest) => Some(manifest),
            Err(ManifestError::NotFound(_)) => {
                debug!("No patch manifest at {:?}", path);
                None
            }
            Err(e) => {
                warn!("Failed to load patch manifest {:?}: {}", path, e);
                None
            }
        }
    }

    /// Load and validate a manifest, reporting why it could not be used
    pub fn load_strict(path: &Path) -> Result<Manifest, ManifestError> {
        if !path.is_file() {
            return Err(ManifestError::NotFound(path.to_path_buf()));
        }

        let metadata = fs::metadata(path)?;
        if metadata.len() > MAX_MANIFEST_SIZE {
            return Err(ManifestError::Invalid(
                "Manifest file too large (max 1MB)".to_string(),
            ));
        }

        let content = fs::read_to_string(path)?;
        let manifest: Manifest = serde_json::from_str(&content)?;
        manifest.validate().map_err(ManifestError::Invalid)?;
        for (target, kind) in manifest.duplicates() {
            warn!("Patch {} ({}) is declared more than once in {:?}", target, kind, path);
        }

        info!(
            "Loaded patch manifest {:?}: {} patches (upstream {})",
            path,
            manifest.patches.len(),
            manifest.upstream_version.as_deref().unwrap_or("unknown")
        );
        Ok(manifest)
    }
}
