//! Patch Manifest
//!
//! The declarative, human-maintained list of intended patches. Loaded fresh
//! on every run and never written by the core.

pub mod loader;
pub mod types;

pub use loader::ManifestStore;
pub use types::{Manifest, PatchEntry, PatchKind, MANIFEST_VERSION};
