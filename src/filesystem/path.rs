// src/filesystem/path.rs

//! Path sanitization for untrusted manifest data
//!
//! Logical paths and domain labels come straight out of the backup's
//! manifest database. A malicious or corrupted manifest could carry
//! values like `../../etc/passwd`; every destination path must therefore
//! be proven to resolve inside the output root before the extractor
//! touches the filesystem.

use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// Sanitize a logical path from the manifest
///
/// 1. Rejects NUL bytes outright
/// 2. Strips leading slashes to make the path relative
/// 3. Drops `.` components
/// 4. Rejects `..` components (path traversal)
/// 5. Neutralizes backslashes inside components (iOS logical paths treat
///    them as data, not separators; the host filesystem may not)
/// 6. Rejects paths that are empty after sanitization
pub fn sanitize_path(path: &str) -> Result<PathBuf> {
    if path.contains('\0') {
        return Err(Error::InvalidPath(format!(
            "path contains NUL byte: {path:?}"
        )));
    }

    // Strip leading slashes to make relative
    let relative = path.trim_start_matches('/');

    let mut normalized = PathBuf::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_string_lossy();
                if part.contains('\\') {
                    normalized.push(part.replace('\\', "_"));
                } else {
                    normalized.push(part.as_ref());
                }
            }
            Component::CurDir => {
                // "." - skip it
            }
            Component::ParentDir => {
                return Err(Error::PathTraversal(path.to_string()));
            }
            Component::Prefix(_) | Component::RootDir => {
                // Absolute markers; leading slashes were already stripped
            }
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(Error::InvalidPath(format!(
            "empty path after sanitization: {path:?}"
        )));
    }

    Ok(normalized)
}

/// Sanitize a single path component, such as a domain label
///
/// Stricter than [`sanitize_path`]: any separator is rejected rather
/// than split, since a domain must map to exactly one directory level.
pub fn sanitize_component(name: &str) -> Result<String> {
    if name.contains('/') || name.contains('\\') {
        return Err(Error::PathTraversal(format!(
            "component contains path separator: {name}"
        )));
    }
    if name == ".." || name == "." {
        return Err(Error::PathTraversal(format!("invalid component: {name}")));
    }
    if name.is_empty() || name.contains('\0') {
        return Err(Error::InvalidPath(format!("invalid component: {name:?}")));
    }
    Ok(name.to_string())
}

/// Join an untrusted path onto a trusted root
///
/// Sanitizes first, then re-verifies containment on the joined result.
/// The second check is redundant with a correct [`sanitize_path`] but
/// catches anything the component walk misses.
pub fn safe_join(root: &Path, path: &str) -> Result<PathBuf> {
    let joined = root.join(sanitize_path(path)?);
    if !joined.starts_with(root) {
        return Err(Error::PathTraversal(format!(
            "path {} escapes output root {}",
            joined.display(),
            root.display()
        )));
    }
    Ok(joined)
}
