//! Undocumented Override Discovery
//!
//! Walks the override tree and reports files that follow a naming
//! convention but are not claimed by any manifest entry.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use globset::GlobMatcher;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::ValidationResult;
use crate::common::{is_hidden, relative_to};
use crate::config::OverlayConfig;
use crate::manifest::{Manifest, PatchEntry, PatchKind};
use crate::resolver::{probe, PathResolver};

/// Override files accounted for by manifest entries
pub fn claimed_paths(
    manifest: &Manifest,
    resolver: &PathResolver,
    override_root: &Path,
) -> HashSet<PathBuf> {
    let mut claimed = HashSet::new();

    for entry in &manifest.patches {
        if entry.kind.is_file_override() {
            if let Some(candidates) = resolver.candidates_for_target(entry.target_id.as_str()) {
                if let Some(found) = probe(&candidates.override_path, resolver.suffixes()) {
                    claimed.insert(found);
                }
            }
        }
        if let Some(file) = entry.file.as_deref() {
            if let Some(found) = probe(&override_root.join(file), resolver.suffixes()) {
                claimed.insert(found);
            }
        }
    }

    claimed
}

/// Results for convention-matching files missing from the manifest
pub fn scan_undocumented(
    config: &OverlayConfig,
    conventions: &[(GlobMatcher, PatchKind)],
    claimed: &HashSet<PathBuf>,
    manifest_path: &Path,
) -> Vec<ValidationResult> {
    let root = &config.override_root;
    let mut results = Vec::new();

    if !root.is_dir() {
        debug!("Override root {:?} does not exist; nothing to scan", root);
        return results;
    }

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable override path: {}", e);
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_file() || is_hidden(path) || path == manifest_path {
            continue;
        }
        if claimed.contains(path) {
            continue;
        }
        let Some(rel) = relative_to(path, root) else {
            continue;
        };
        let Some(kind) = conventions
            .iter()
            .find(|(matcher, _)| matcher.is_match(&rel))
            .map(|(_, kind)| *kind)
        else {
            continue;
        };

        let Some(patch) = synthesize_entry(config, &rel, kind) else {
            debug!("Cannot express {} as a {} entry", rel, kind);
            continue;
        };
        debug!("Undocumented override: {}", rel);
        let message = format!(
            "Undocumented {} override: add '{}' to the manifest",
            kind, patch.target_id
        );
        results.push(ValidationResult {
            undocumented: true,
            ..ValidationResult::ok(patch, None, Some(message))
        });
    }

    results
}

/// Manifest entry that would claim the file at `rel`
fn synthesize_entry(config: &OverlayConfig, rel: &str, kind: PatchKind) -> Option<PatchEntry> {
    if kind.is_file_override() {
        let under_alias = rel
            .strip_prefix(config.alias_segment())
            .and_then(|rest| rest.strip_prefix('/'))?;
        let target = format!("{}/{}", config.alias_prefix, under_alias);
        return Some(PatchEntry::new(target, kind));
    }

    // One file per entry; `mail.patch.ts` and `mail.patch.js` stay distinct.
    Some(PatchEntry::new(rel, kind).with_file(rel))
}
