//! Path Resolver
//!
//! Maps a logical import specifier onto candidate files in the override and
//! base trees. Pure apart from filesystem probes; logging and statistics
//! belong to the caller.

use std::path::{Path, PathBuf};

use crate::common::{strip_prefix_segment, with_suffix};
use crate::config::OverlayConfig;

/// Which tree a resolution came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Override,
    Base,
}

/// A resolved import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub path: PathBuf,
    pub origin: Origin,
}

/// Unprobed candidate paths for one specifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidates {
    pub override_path: PathBuf,
    pub base_path: PathBuf,
}

/// First `path + suffix` that is a regular file, trying suffixes in order
pub fn probe(path: &Path, suffixes: &[String]) -> Option<PathBuf> {
    suffixes
        .iter()
        .map(|suffix| with_suffix(path, suffix))
        .find(|candidate| candidate.is_file())
}

#[derive(Debug, Clone)]
pub struct PathResolver {
    alias_prefix: String,
    base_alias_prefix: String,
    segment: String,
    override_root: PathBuf,
    base_root: PathBuf,
    suffixes: Vec<String>,
}

impl PathResolver {
    pub fn new(config: &OverlayConfig) -> Self {
        Self {
            alias_prefix: config.alias_prefix.clone(),
            base_alias_prefix: config.base_alias_prefix.clone(),
            segment: config.alias_segment().to_string(),
            override_root: config.override_root.clone(),
            base_root: config.base_root.clone(),
            suffixes: config.suffixes.clone(),
        }
    }

    pub fn override_root(&self) -> &Path {
        &self.override_root
    }

    pub fn base_root(&self) -> &Path {
        &self.base_root
    }

    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }

    pub fn alias_prefix(&self) -> &str {
        &self.alias_prefix
    }

    /// Candidate paths for a path relative to the aliased directory
    pub fn candidates_for(&self, relative: &str) -> Candidates {
        Candidates {
            override_path: self.override_root.join(&self.segment).join(relative),
            base_path: self.base_root.join(&self.segment).join(relative),
        }
    }

    /// Candidate paths for an alias-prefixed specifier, before probing
    pub fn candidates(&self, specifier: &str) -> Option<Candidates> {
        strip_prefix_segment(specifier, &self.alias_prefix).map(|rel| self.candidates_for(rel))
    }

    /// Candidate paths for a manifest target
    ///
    /// Accepts an alias-prefixed specifier or a path relative to the aliased
    /// directory. Absolute paths and always-base specifiers name no override.
    pub fn candidates_for_target(&self, target: &str) -> Option<Candidates> {
        if let Some(candidates) = self.candidates(target) {
            return Some(candidates);
        }
        if strip_prefix_segment(target, &self.base_alias_prefix).is_some()
            || target.starts_with(&format!("{}/", self.alias_prefix))
            || Path::new(target).is_absolute()
        {
            return None;
        }
        let relative = target.trim_start_matches("./");
        if relative.is_empty() {
            return None;
        }
        Some(self.candidates_for(relative))
    }

    /// Resolve a specifier
    ///
    /// The always-base prefix resolves only against the base tree, so an
    /// override can import the file it replaces. The overlay prefix resolves
    /// only to an existing override; anything else is `None` and the caller
    /// falls through to its normal resolution.
    pub fn resolve(&self, specifier: &str) -> Option<Resolution> {
        if let Some(rel) = strip_prefix_segment(specifier, &self.base_alias_prefix) {
            return probe(&self.candidates_for(rel).base_path, &self.suffixes).map(|path| {
                Resolution {
                    path,
                    origin: Origin::Base,
                }
            });
        }

        let candidates = self.candidates(specifier)?;
        probe(&candidates.override_path, &self.suffixes).map(|path| Resolution {
            path,
            origin: Origin::Override,
        })
    }

    /// Resolve the base file a specifier would shadow, ignoring overrides
    pub fn resolve_base(&self, specifier: &str) -> Option<PathBuf> {
        let candidates = self.candidates(specifier)?;
        probe(&candidates.base_path, &self.suffixes)
    }
}
