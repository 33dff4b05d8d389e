//! Resolution statistics for one build session.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

/// Overridden specifiers and how many lookups were attempted
#[derive(Debug, Clone, Default)]
pub struct OverlayStats {
    resolved: IndexMap<String, PathBuf>,
    attempts: u64,
}

impl OverlayStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn attempt(&mut self) {
        self.attempts += 1;
    }

    /// Record a resolution. The first path recorded for a specifier is kept.
    ///
    /// Returns `true` when the specifier was not recorded before.
    pub(crate) fn record(&mut self, specifier: &str, path: &Path) -> bool {
        if self.resolved.contains_key(specifier) {
            return false;
        }
        self.resolved.insert(specifier.to_string(), path.to_path_buf());
        true
    }

    pub fn get(&self, specifier: &str) -> Option<&Path> {
        self.resolved.get(specifier).map(PathBuf::as_path)
    }

    /// Overridden specifiers in first-resolution order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.resolved
            .iter()
            .map(|(spec, path)| (spec.as_str(), path.as_path()))
    }

    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }
}
