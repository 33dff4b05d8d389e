//! Human-readable validation report.

use super::{ValidationReport, ValidationResult, ValidationStatus};

fn label(result: &ValidationResult) -> &'static str {
    if result.undocumented {
        return "NOTE";
    }
    match result.status {
        ValidationStatus::Ok => "OK",
        ValidationStatus::Missing => "MISSING",
        ValidationStatus::Changed => "CHANGED",
        ValidationStatus::Error => "ERROR",
    }
}

/// Render a report. Failures always show their detail; `verbose` adds
/// detail for passing entries too.
pub fn render_report(report: &ValidationReport, verbose: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "Patch validation ({})",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    lines.push(String::new());

    for result in &report.results {
        lines.push(format!(
            "  [{}] {} {}",
            label(result),
            result.patch.kind,
            result.patch.target_id
        ));
        if !result.valid || result.undocumented || verbose {
            if let Some(message) = &result.message {
                lines.push(format!("         {}", message));
            }
            if let Some(path) = &result.base_path {
                lines.push(format!("         path: {}", path.display()));
            }
            if verbose && !result.patch.description.is_empty() {
                lines.push(format!("         {}", result.patch.description));
            }
        }
    }

    let counts = report.counts();
    let undocumented = report.undocumented().count();
    lines.push(String::new());
    lines.push(format!(
        "{} checked: {} ok, {} missing, {} changed, {} error ({} undocumented)",
        report.results.len(),
        counts.ok,
        counts.missing,
        counts.changed,
        counts.error,
        undocumented
    ));
    let overall = if report.passed() { "PASSED" } else { "FAILED" };
    lines.push(format!("Result: {}", overall));

    lines.join("\n")
}
