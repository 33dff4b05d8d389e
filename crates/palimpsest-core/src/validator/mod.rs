//! Patch Validator
//!
//! Compares the manifest against the override and base trees without
//! executing any patch, and reports per-entry drift.

pub mod checks;
pub mod discovery;
pub mod report;

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::manifest::PatchEntry;

pub use checks::Validator;
pub use report::render_report;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Ok,
    Missing,
    Changed,
    Error,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Ok => "ok",
            ValidationStatus::Missing => "missing",
            ValidationStatus::Changed => "changed",
            ValidationStatus::Error => "error",
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome for one manifest entry (or one undocumented file)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub patch: PatchEntry,
    pub valid: bool,
    pub status: ValidationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// The path the status refers to: the resolved base file when ok, the
    /// path that was looked for otherwise
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_path: Option<PathBuf>,
    /// Found by naming convention but absent from the manifest
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub undocumented: bool,
}

impl ValidationResult {
    pub fn ok(patch: PatchEntry, base_path: Option<PathBuf>, message: Option<String>) -> Self {
        Self {
            patch,
            valid: true,
            status: ValidationStatus::Ok,
            message,
            base_path,
            undocumented: false,
        }
    }

    pub fn failed(
        patch: PatchEntry,
        status: ValidationStatus,
        base_path: Option<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            patch,
            valid: false,
            status,
            message: Some(message.into()),
            base_path,
            undocumented: false,
        }
    }
}

/// Per-status tallies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub ok: usize,
    pub missing: usize,
    pub changed: usize,
    pub error: usize,
}

/// All results of one validator run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub generated_at: DateTime<Utc>,
    pub results: Vec<ValidationResult>,
}

impl ValidationReport {
    pub fn new(results: Vec<ValidationResult>) -> Self {
        Self {
            generated_at: Utc::now(),
            results,
        }
    }

    /// The run fails iff any result is invalid
    pub fn passed(&self) -> bool {
        self.results.iter().all(|r| r.valid)
    }

    /// Process exit status: 0 when every result is valid, 1 otherwise
    pub fn exit_code(&self) -> u8 {
        if self.passed() {
            0
        } else {
            1
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(|r| !r.valid)
    }

    pub fn undocumented(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(|r| r.undocumented)
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for result in &self.results {
            match result.status {
                ValidationStatus::Ok => counts.ok += 1,
                ValidationStatus::Missing => counts.missing += 1,
                ValidationStatus::Changed => counts.changed += 1,
                ValidationStatus::Error => counts.error += 1,
            }
        }
        counts
    }
}
