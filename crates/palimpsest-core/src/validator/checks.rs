//! Per-kind manifest checks.

use std::path::Path;

use globset::GlobMatcher;
use tracing::{debug, info};

use super::discovery::{claimed_paths, scan_undocumented};
use super::{ValidationReport, ValidationResult, ValidationStatus};
use crate::common::ConfigError;
use crate::config::OverlayConfig;
use crate::manifest::{Manifest, PatchEntry, PatchKind};
use crate::resolver::{probe, PathResolver};

pub struct Validator {
    config: OverlayConfig,
    resolver: PathResolver,
    conventions: Vec<(GlobMatcher, PatchKind)>,
}

impl Validator {
    pub fn new(config: OverlayConfig) -> Result<Self, ConfigError> {
        let conventions = config
            .conventions
            .iter()
            .map(|c| c.matcher().map(|m| (m, c.kind)))
            .collect::<Result<Vec<_>, _>>()?;
        let resolver = PathResolver::new(&config);

        Ok(Self {
            config,
            resolver,
            conventions,
        })
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Validate every manifest entry, then flag undocumented override files
    pub fn run(&self, manifest: &Manifest) -> ValidationReport {
        let mut results: Vec<ValidationResult> =
            manifest.patches.iter().map(|p| self.check(p)).collect();

        let claimed = claimed_paths(manifest, &self.resolver, &self.config.override_root);
        let undocumented = scan_undocumented(
            &self.config,
            &self.conventions,
            &claimed,
            &self.config.manifest_path(),
        );
        if !undocumented.is_empty() {
            info!(
                "Found {} override files not listed in the manifest",
                undocumented.len()
            );
        }
        results.extend(undocumented);

        let report = ValidationReport::new(results);
        let counts = report.counts();
        info!(
            "Validated {} entries: {} ok, {} missing, {} changed, {} error",
            manifest.patches.len(),
            counts.ok,
            counts.missing,
            counts.changed,
            counts.error
        );
        report
    }

    /// Check a single entry
    pub fn check(&self, entry: &PatchEntry) -> ValidationResult {
        let result = match entry.kind {
            PatchKind::Replace | PatchKind::Extend => self.check_file_override(entry),
            PatchKind::ServiceExtension | PatchKind::NewController | PatchKind::Module => {
                self.check_extension_file(entry)
            }
            PatchKind::Hook => ValidationResult::ok(
                entry.clone(),
                None,
                Some("Hooks cannot be verified without execution".to_string()),
            ),
        };
        debug!(
            "{} {} -> {}",
            entry.kind, entry.target_id, result.status
        );
        result
    }

    fn check_file_override(&self, entry: &PatchEntry) -> ValidationResult {
        let Some(candidates) = self
            .resolver
            .candidates_for_target(entry.target_id.as_str())
        else {
            return ValidationResult::failed(
                entry.clone(),
                ValidationStatus::Error,
                None,
                format!(
                    "Target must be '{}/...' or a path relative to '{}'",
                    self.config.alias_prefix,
                    self.config.alias_segment()
                ),
            );
        };

        let suffixes = self.resolver.suffixes();
        if probe(&candidates.override_path, suffixes).is_none() {
            return ValidationResult::failed(
                entry.clone(),
                ValidationStatus::Missing,
                Some(candidates.override_path),
                "Override file not found",
            );
        }

        match probe(&candidates.base_path, suffixes) {
            Some(base) => ValidationResult::ok(entry.clone(), Some(base), None),
            None => ValidationResult::failed(
                entry.clone(),
                ValidationStatus::Changed,
                Some(candidates.base_path),
                "Base file not found; it may have been moved or removed upstream",
            ),
        }
    }

    fn check_extension_file(&self, entry: &PatchEntry) -> ValidationResult {
        let Some(file) = entry.file.as_deref() else {
            return ValidationResult::failed(
                entry.clone(),
                ValidationStatus::Error,
                None,
                format!("No extension file declared for {} entry", entry.kind),
            );
        };

        let declared = self.config.override_root.join(file);
        if Path::new(file).is_absolute() {
            return ValidationResult::failed(
                entry.clone(),
                ValidationStatus::Error,
                Some(declared),
                "Extension file must be relative to the override root",
            );
        }

        match probe(&declared, self.resolver.suffixes()) {
            Some(found) => ValidationResult::ok(
                entry.clone(),
                Some(found),
                Some(format!(
                    "Target {} cannot be verified statically",
                    entry.target_id
                )),
            ),
            None => ValidationResult::failed(
                entry.clone(),
                ValidationStatus::Missing,
                Some(declared),
                "Extension file not found",
            ),
        }
    }
}
