//! Palimpsest core
//!
//! Lets an adopter extend a host application from a separate overlay tree.
//! Three pieces carry the invariants:
//!
//! - [`overlay`]: build-time import resolution that prefers override files,
//!   with an always-base alias as the escape hatch back to the original.
//! - [`patches`]: a registry of service replacements applied exactly once,
//!   in registration order, to an external container.
//! - [`validator`]: manifest-driven drift detection against the override and
//!   base trees.

pub mod common;
pub mod config;
pub mod manifest;
pub mod overlay;
pub mod patches;
pub mod resolver;
pub mod validator;

pub use common::{BoxError, ConfigError, ContainerError, ManifestError, OverlayError, PatchError};
pub use config::{NamingConvention, OverlayConfig};
pub use manifest::{Manifest, ManifestStore, PatchEntry, PatchKind};
pub use overlay::{HotUpdate, OverlayEngine, OverlayWatcher};
pub use patches::{PatchRegistry, ServiceContainer, ServicePatch, TargetId};
pub use resolver::{PathResolver, Resolution};
pub use validator::{ValidationReport, ValidationResult, ValidationStatus, Validator};
