//! Entry path checks.
//!
//! Every entry path is joined onto a scratch directory before the archiving
//! tool sees it, so paths that would climb out of that directory are refused
//! up front. Editability is decided here too, by file extension.

use crate::error::SecurityError;
use std::path::{Component, Path, PathBuf};

/// Extensions offered for editing when no configuration overrides them.
pub const DEFAULT_EDITABLE_EXTENSIONS: &[&str] = &["txt", "md", "json"];

/// Validates and normalizes an archive entry path to prevent path traversal.
///
/// This function performs the following checks:
/// - Rejects absolute paths
/// - Rejects paths containing ".." components
/// - Normalizes the path to remove redundant separators and "." components
/// - Rejects paths starting with `-` or `@`, which 7-Zip reads as a switch or
///   a list file. Wildcard characters are passed through unchanged.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use zipedit::safety::validate_entry_path;
///
/// let safe_path = validate_entry_path("dir/file.txt").unwrap();
/// assert_eq!(safe_path, Path::new("dir/file.txt"));
///
/// assert!(validate_entry_path("../../etc/passwd").is_err());
/// assert!(validate_entry_path("/etc/passwd").is_err());
/// ```
pub fn validate_entry_path(entry: &str) -> Result<PathBuf, SecurityError> {
    let path = Path::new(entry);

    if path.is_absolute() || entry.starts_with('/') || entry.starts_with('\\') {
        return Err(SecurityError::AbsolutePath(entry.to_string()));
    }

    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Normal(part) => {
                // Backslash-separated traversal is not split by Path on unix
                if part
                    .to_str()
                    .map(|p| p.split('\\').any(|s| s == ".."))
                    .unwrap_or(false)
                {
                    return Err(SecurityError::PathTraversal(format!(
                        "Path contains '..' component: {}",
                        entry
                    )));
                }
                normalized.push(part);
            }
            Component::CurDir => continue,
            Component::ParentDir => {
                return Err(SecurityError::PathTraversal(format!(
                    "Path contains '..' component: {}",
                    entry
                )));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(SecurityError::AbsolutePath(entry.to_string()));
            }
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(SecurityError::PathTraversal(
            "Path normalizes to empty".to_string(),
        ));
    }

    let leads_with_option = |s: &str| s.starts_with('-') || s.starts_with('@');
    if leads_with_option(entry) || normalized.to_str().is_some_and(leads_with_option) {
        return Err(SecurityError::SwitchLikePath(entry.to_string()));
    }

    Ok(normalized)
}

/// Whether `entry` may be opened for editing, judged by its extension
/// (case-insensitive, surrounding whitespace ignored).
///
/// ```
/// use zipedit::safety::{is_editable, DEFAULT_EDITABLE_EXTENSIONS};
///
/// assert!(is_editable("notes/README.MD", DEFAULT_EDITABLE_EXTENSIONS));
/// assert!(!is_editable("icons/logo.png", DEFAULT_EDITABLE_EXTENSIONS));
/// ```
pub fn is_editable<S: AsRef<str>>(entry: &str, extensions: &[S]) -> bool {
    match entry.trim().rsplit_once('.') {
        Some((_, ext)) => extensions
            .iter()
            .any(|allowed| allowed.as_ref().eq_ignore_ascii_case(ext)),
        None => false,
    }
}
