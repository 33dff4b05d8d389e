//! Manifest Types
//!
//! Rust structs matching the patch manifest JSON file.

use std::collections::HashSet;
use std::fmt;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::patches::TargetId;

/// Manifest schema version written by current tooling
pub const MANIFEST_VERSION: &str = "1.0.0";

/// What a manifest entry declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchKind {
    Replace,
    Extend,
    ServiceExtension,
    NewController,
    Module,
    Hook,
}

impl PatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatchKind::Replace => "replace",
            PatchKind::Extend => "extend",
            PatchKind::ServiceExtension => "service_extension",
            PatchKind::NewController => "new_controller",
            PatchKind::Module => "module",
            PatchKind::Hook => "hook",
        }
    }

    /// Kinds that shadow a file in the base tree
    pub fn is_file_override(&self) -> bool {
        matches!(self, PatchKind::Replace | PatchKind::Extend)
    }

    /// Kinds backed by a standalone extension file in the override tree
    pub fn is_extension_file(&self) -> bool {
        matches!(
            self,
            PatchKind::ServiceExtension | PatchKind::NewController | PatchKind::Module
        )
    }
}

impl fmt::Display for PatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared patch. Carries no executable content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchEntry {
    pub target_id: TargetId,
    pub kind: PatchKind,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overridden_operations: Option<IndexSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_name: Option<String>,
    /// Override-root-relative path of the declared extension file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl PatchEntry {
    pub fn new(target_id: impl Into<TargetId>, kind: PatchKind) -> Self {
        Self {
            target_id: target_id.into(),
            kind,
            description: String::new(),
            added_date: None,
            overridden_operations: None,
            route_prefix: None,
            module_name: None,
            file: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }
}

/// The patch manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_version: Option<String>,
    #[serde(default)]
    pub patches: Vec<PatchEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            upstream_version: None,
            patches: Vec::new(),
            last_updated: None,
        }
    }
}

impl Manifest {
    /// Validate manifest structure
    pub fn validate(&self) -> Result<(), String> {
        if self.version.trim().is_empty() {
            return Err("Manifest version cannot be empty".to_string());
        }

        for (idx, entry) in self.patches.iter().enumerate() {
            if entry.target_id.as_str().trim().is_empty() {
                return Err(format!("Patch #{} has an empty targetId", idx));
            }
        }

        Ok(())
    }

    /// `(targetId, kind)` pairs declared more than once, in first-repeat order
    pub fn duplicates(&self) -> Vec<(&TargetId, PatchKind)> {
        let mut seen = HashSet::new();
        let mut repeated = Vec::new();
        for entry in &self.patches {
            let key = (&entry.target_id, entry.kind);
            if !seen.insert(key) && !repeated.contains(&key) {
                repeated.push(key);
            }
        }
        repeated
    }

    /// Entries of the given kinds, in manifest order
    pub fn entries_of<'a>(
        &'a self,
        kinds: &'a [PatchKind],
    ) -> impl Iterator<Item = &'a PatchEntry> + 'a {
        self.patches.iter().filter(move |p| kinds.contains(&p.kind))
    }
}
