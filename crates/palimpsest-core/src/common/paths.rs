//! Path Utilities
//!
//! Small helpers shared by the resolver and the validator.

use std::path::{Path, PathBuf};

/// Strip `prefix` followed by `/` from a specifier.
///
/// Returns the remainder with any extra leading slashes removed, or `None`
/// when the specifier does not start with the prefix segment or the
/// remainder is empty.
///
/// # Example
/// ```ignore
/// assert_eq!(strip_prefix_segment("@/views/Home", "@"), Some("views/Home"));
/// assert_eq!(strip_prefix_segment("@base/views/Home", "@"), None);
/// ```
pub fn strip_prefix_segment<'a>(specifier: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = specifier.strip_prefix(prefix)?.strip_prefix('/')?;
    let rest = rest.trim_start_matches('/');
    if rest.is_empty() {
        None
    } else {
        Some(rest)
    }
}

/// Path of `path` relative to `root`, using `/` separators
pub fn relative_to(path: &Path, root: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Relative path with its final extension removed, e.g. `server/mail.patch`
pub fn module_name(rel: &str) -> &str {
    let file_start = rel.rfind('/').map_or(0, |slash| slash + 1);
    match rel.rfind('.') {
        Some(dot) if dot > file_start => &rel[..dot],
        _ => rel,
    }
}

/// Dotfiles and editor temp files are never overrides
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|name| name.starts_with('.') || name.ends_with(".tmp") || name.ends_with(".swp"))
        .unwrap_or(false)
}

/// Append a probe suffix to a path without going through `Path::join`
///
/// Suffixes such as `.ts` extend the file name while `/index.ts` descends into
/// a directory, so plain string concatenation covers both.
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    if suffix.is_empty() {
        return path.to_path_buf();
    }
    let mut raw = path.as_os_str().to_os_string();
    raw.push(suffix);
    PathBuf::from(raw)
}
