//! Overlay Resolution
//!
//! Build-time import rewriting toward the override tree, resolution
//! statistics, and hot-update handling for override files.

pub mod engine;
pub mod stats;
pub mod watcher;

pub use engine::{BuildCheck, MissingFile, OverlayEngine, OverlaySummary, Side};
pub use stats::OverlayStats;
pub use watcher::{HotUpdate, HotUpdatePolicy, OverlayWatcher};
