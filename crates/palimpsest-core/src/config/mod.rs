//! Overlay Configuration
//!
//! Where the override and base trees live, how import specifiers map onto
//! them, and which naming conventions mark a file as an override.

use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::common::ConfigError;
use crate::manifest::PatchKind;

/// Default manifest file name under the override root
pub const DEFAULT_MANIFEST_FILE: &str = "patches.json";

/// Probe order for override and base lookups.
///
/// Bare name first, then typed variants, then directory index files. Ties
/// between several existing files are always broken by this order.
pub const DEFAULT_SUFFIXES: &[&str] = &[
    "",
    ".vue",
    ".ts",
    ".tsx",
    ".js",
    ".jsx",
    "/index.vue",
    "/index.ts",
    "/index.js",
];

/// A glob over override-root-relative paths, tagged with the patch kind a
/// matching file represents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingConvention {
    pub pattern: String,
    pub kind: PatchKind,
}

impl NamingConvention {
    pub fn new(pattern: impl Into<String>, kind: PatchKind) -> Self {
        Self {
            pattern: pattern.into(),
            kind,
        }
    }

    /// Compile the glob pattern
    pub fn matcher(&self) -> Result<GlobMatcher, ConfigError> {
        Glob::new(&self.pattern)
            .map(|glob| glob.compile_matcher())
            .map_err(|source| ConfigError::InvalidPattern {
                pattern: self.pattern.clone(),
                source,
            })
    }
}

/// Overlay configuration shared by the engine, the registry's discovery step,
/// and the validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverlayConfig {
    pub override_root: PathBuf,
    pub base_root: PathBuf,
    pub alias_prefix: String,
    pub base_alias_prefix: String,
    /// Directory segment joined under each root; `None` uses the alias
    /// prefix itself.
    pub alias_dir: Option<String>,
    pub suffixes: Vec<String>,
    pub template_extensions: Vec<String>,
    pub conventions: Vec<NamingConvention>,
    pub manifest_file: String,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            override_root: PathBuf::from("overrides"),
            base_root: PathBuf::from("."),
            alias_prefix: "@".to_string(),
            base_alias_prefix: "@base".to_string(),
            alias_dir: Some("src".to_string()),
            suffixes: DEFAULT_SUFFIXES.iter().map(|s| s.to_string()).collect(),
            template_extensions: vec!["vue".to_string()],
            conventions: default_conventions(),
            manifest_file: DEFAULT_MANIFEST_FILE.to_string(),
        }
    }
}

fn default_conventions() -> Vec<NamingConvention> {
    vec![
        NamingConvention::new("src/**/*", PatchKind::Replace),
        NamingConvention::new("server/**/*.patch.{ts,js}", PatchKind::ServiceExtension),
        NamingConvention::new("server/**/*.controller.{ts,js}", PatchKind::NewController),
        NamingConvention::new("server/**/*.module.{ts,js}", PatchKind::Module),
    ]
}

impl OverlayConfig {
    /// Default configuration rooted at the given override and base trees
    pub fn from_roots(override_root: impl Into<PathBuf>, base_root: impl Into<PathBuf>) -> Self {
        Self {
            override_root: override_root.into(),
            base_root: base_root.into(),
            ..Self::default()
        }
    }

    /// Load a configuration file, filling unspecified fields with defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: OverlayConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;

        info!("Loaded overlay config from {:?}", path);
        Ok(config)
    }

    /// Check that every naming convention compiles
    pub fn validate(&self) -> Result<(), ConfigError> {
        for convention in &self.conventions {
            convention.matcher()?;
        }
        Ok(())
    }

    /// Directory segment joined under both roots for aliased specifiers
    pub fn alias_segment(&self) -> &str {
        self.alias_dir.as_deref().unwrap_or(&self.alias_prefix)
    }

    /// Location of the patch manifest
    pub fn manifest_path(&self) -> PathBuf {
        self.override_root.join(&self.manifest_file)
    }
}
