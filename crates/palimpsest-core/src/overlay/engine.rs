//! Overlay Engine
//!
//! The build pipeline's resolution hook. One engine lives for one build
//! session; nothing it reports can fail the build.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::stats::OverlayStats;
use super::watcher::{HotUpdate, HotUpdatePolicy};
use crate::config::OverlayConfig;
use crate::manifest::{Manifest, ManifestStore, PatchKind};
use crate::patches::TargetId;
use crate::resolver::{probe, Origin, PathResolver};

/// Which tree a missing file belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Override,
    Base,
}

/// A manifest-declared file that could not be found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingFile {
    pub target: TargetId,
    pub side: Side,
    pub path: PathBuf,
}

/// Result of the non-blocking build-start validation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildCheck {
    /// Manifest entries examined (replace and extend only)
    pub checked: usize,
    pub missing: Vec<MissingFile>,
}

impl BuildCheck {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty()
    }
}

/// End-of-build report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlaySummary {
    pub overridden: usize,
    pub attempts: u64,
    pub specifiers: Vec<String>,
}

pub struct OverlayEngine {
    config: OverlayConfig,
    resolver: PathResolver,
    stats: OverlayStats,
}

impl OverlayEngine {
    pub fn new(config: OverlayConfig) -> Self {
        let resolver = PathResolver::new(&config);
        Self {
            config,
            resolver,
            stats: OverlayStats::new(),
        }
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn stats(&self) -> &OverlayStats {
        &self.stats
    }

    /// Module lookup hook
    ///
    /// `Some(path)` replaces the pipeline's own resolution for `specifier`;
    /// `None` means continue down the normal resolution chain.
    pub fn resolve_id(&mut self, specifier: &str) -> Option<PathBuf> {
        self.stats.attempt();

        let resolution = self.resolver.resolve(specifier)?;
        if resolution.origin == Origin::Override
            && self.stats.record(specifier, &resolution.path)
        {
            debug!("Override: {} -> {:?}", specifier, resolution.path);
        }
        Some(resolution.path)
    }

    /// Check that every replace/extend entry has both its override and its
    /// base file. Problems are logged and returned, never raised.
    pub fn build_start(&self, manifest: Option<&Manifest>) -> BuildCheck {
        let mut check = BuildCheck::default();
        let Some(manifest) = manifest else {
            debug!("No patch manifest; skipping override validation");
            return check;
        };

        for entry in manifest.entries_of(&[PatchKind::Replace, PatchKind::Extend]) {
            check.checked += 1;
            let Some(candidates) = self.resolver.candidates_for_target(entry.target_id.as_str())
            else {
                warn!("Cannot map manifest target to a file: {}", entry.target_id);
                continue;
            };

            let suffixes = self.resolver.suffixes();
            if probe(&candidates.override_path, suffixes).is_none() {
                warn!(
                    "Override missing for {}: {:?}",
                    entry.target_id, candidates.override_path
                );
                check.missing.push(MissingFile {
                    target: entry.target_id.clone(),
                    side: Side::Override,
                    path: candidates.override_path,
                });
            }
            if probe(&candidates.base_path, suffixes).is_none() {
                warn!(
                    "Base file missing for {} (changed upstream?): {:?}",
                    entry.target_id, candidates.base_path
                );
                check.missing.push(MissingFile {
                    target: entry.target_id.clone(),
                    side: Side::Base,
                    path: candidates.base_path,
                });
            }
        }

        if check.is_clean() {
            info!("Override validation passed ({} entries)", check.checked);
        } else {
            warn!(
                "Override validation found {} missing files across {} entries",
                check.missing.len(),
                check.checked
            );
        }
        check
    }

    /// `build_start` against the manifest configured for the override root
    pub fn build_start_from_disk(&self) -> BuildCheck {
        let manifest = ManifestStore::load(&self.config.manifest_path());
        self.build_start(manifest.as_ref())
    }

    /// Summarize the session; with `list`, log each overridden specifier
    pub fn build_end(&self, list: bool) -> OverlaySummary {
        let summary = OverlaySummary {
            overridden: self.stats.len(),
            attempts: self.stats.attempts(),
            specifiers: self.stats.iter().map(|(s, _)| s.to_string()).collect(),
        };

        info!(
            "Overlay: {} modules overridden ({} lookups)",
            summary.overridden, summary.attempts
        );
        if list {
            for (specifier, path) in self.stats.iter() {
                info!("  {} -> {:?}", specifier, path);
            }
        }
        summary
    }

    pub fn hot_update_policy(&self) -> HotUpdatePolicy {
        HotUpdatePolicy::new(&self.config)
    }

    /// How the host should react to a change at `path`
    pub fn handle_hot_update(&self, path: &Path) -> HotUpdate {
        self.hot_update_policy().decide(path)
    }
}
