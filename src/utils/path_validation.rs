//! Path validation and security utilities.
//!
//! Every registry-virtual path and every alias directory passes through
//! [`sanitize_relative_path`] before it is joined onto a base directory, and every
//! file the installer or the cache writes is confined with
//! [`resolve_path_within_dir`].
//!
//! The checks are component-wise rather than string-prefix based, so a sibling
//! directory such as `/base-evil` is never accepted as being inside `/base`.

use anyhow::{Context, Result, anyhow};
use std::path::{Component, Path, PathBuf};

use crate::core::GreaterError;

fn traversal(input: &str, reason: &str) -> anyhow::Error {
    GreaterError::PathTraversal {
        path: input.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

/// Normalize a relative path to forward-slash form and reject anything unsafe.
///
/// Backslashes become `/`, empty and `.` segments are dropped. The input is
/// rejected with [`GreaterError::PathTraversal`] when it:
/// - contains a NUL byte
/// - is absolute (`/etc/passwd`, `\\server\share`)
/// - starts with a drive letter (`C:`, `C:\Windows`)
/// - contains a `..` segment anywhere
/// - is empty after normalization
///
/// # Examples
///
/// ```
/// use greater_cli::utils::path_validation::sanitize_relative_path;
///
/// assert_eq!(sanitize_relative_path("lib\\ui/./Button.svelte").unwrap(), "lib/ui/Button.svelte");
/// assert!(sanitize_relative_path("lib/../../etc/passwd").is_err());
/// assert!(sanitize_relative_path("C:\\Windows").is_err());
/// ```
pub fn sanitize_relative_path(input: &str) -> Result<String> {
    if input.contains('\0') {
        return Err(traversal(input, "path contains a NUL byte"));
    }

    let normalized = input.replace('\\', "/");

    if normalized.starts_with('/') {
        return Err(traversal(input, "absolute paths are not allowed"));
    }

    if has_drive_prefix(&normalized) {
        return Err(traversal(input, "drive letters are not allowed"));
    }

    let mut segments = Vec::new();
    for segment in normalized.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Err(traversal(input, "parent directory references are not allowed")),
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        return Err(traversal(input, "path is empty after normalization"));
    }

    Ok(segments.join("/"))
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Sanitize `relative` and join it onto `base_dir`, confirming the result stays inside.
///
/// The returned path is exactly `base_dir` joined with the sanitized segments; it is
/// not canonicalized. When `base_dir` exists on disk, the deepest existing ancestor of
/// the target is canonicalized as well so that a symlinked directory pointing outside
/// the base is rejected.
pub fn resolve_path_within_dir(base_dir: &Path, relative: &str) -> Result<PathBuf> {
    let sanitized = sanitize_relative_path(relative)?;

    let mut resolved = base_dir.to_path_buf();
    for segment in sanitized.split('/') {
        resolved.push(segment);
    }

    if !is_within_dir(base_dir, &resolved) {
        return Err(traversal(relative, "resolves outside the target directory"));
    }

    if base_dir.exists() {
        let canonical_base = safe_canonicalize(base_dir)?;
        if let Some(ancestor) = deepest_existing_ancestor(&resolved) {
            let canonical_ancestor = safe_canonicalize(&ancestor)?;
            if !canonical_ancestor.starts_with(&canonical_base) {
                return Err(traversal(
                    relative,
                    "a symbolic link leads outside the target directory",
                ));
            }
        }
    }

    Ok(resolved)
}

/// Lexical, component-wise check that `candidate` lies inside (or equals) `base`.
///
/// `.` components are ignored and `..` components pop the previous component, so
/// `base/a/../b` counts as inside while `base/../x` does not. No filesystem access.
pub fn is_within_dir(base: &Path, candidate: &Path) -> bool {
    let base = lexical_normalize(base);
    let candidate = lexical_normalize(candidate);
    match (base, candidate) {
        (Some(base), Some(candidate)) => candidate.starts_with(&base),
        _ => false,
    }
}

/// Leading `..` of a relative path are kept so `../app` and `../app/x` compare
/// consistently; `..` directly above a root is `None`.
fn lexical_normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => return None,
                Some(Component::ParentDir | Component::CurDir) | None => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    Some(out)
}

/// `path` made absolute against the current directory, without touching the filesystem.
pub fn absolute_dir(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path)
        .with_context(|| format!("Failed to resolve directory '{}'", path.display()))
}

fn deepest_existing_ancestor(path: &Path) -> Option<PathBuf> {
    path.ancestors().find(|p| p.symlink_metadata().is_ok()).map(Path::to_path_buf)
}

/// Canonicalize a path that may not exist yet.
///
/// Falls back to canonicalizing the parent and re-appending the file name.
pub fn safe_canonicalize(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        if let Some(parent) = path.parent()
            && parent.exists()
        {
            let canonical_parent = parent.canonicalize().with_context(|| {
                format!("Failed to canonicalize parent of '{}'", path.display())
            })?;

            if let Some(file_name) = path.file_name() {
                return Ok(canonical_parent.join(file_name));
            }
        }
        return Err(anyhow!("Path does not exist: {}", path.display()));
    }

    path.canonicalize().with_context(|| format!("Failed to canonicalize path: {}", path.display()))
}

/// Walk upwards from `start_path` until a directory containing `marker` is found.
pub fn find_project_root(start_path: &Path, marker: &str) -> Option<PathBuf> {
    let mut current = Some(start_path);
    while let Some(dir) = current {
        if dir.join(marker).is_file() {
            return Some(dir.to_path_buf());
        }
        current = dir.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_sanitize_accepts_and_normalizes() {
        assert_eq!(sanitize_relative_path("lib/Button.svelte").unwrap(), "lib/Button.svelte");
        assert_eq!(
            sanitize_relative_path("lib\\ui\\Button.svelte").unwrap(),
            "lib/ui/Button.svelte"
        );
        assert_eq!(sanitize_relative_path("./lib//a/./b.ts").unwrap(), "lib/a/b.ts");
        assert_eq!(sanitize_relative_path("lib/").unwrap(), "lib");
        // A dotted file name is not a traversal
        assert_eq!(sanitize_relative_path("lib/..hidden").unwrap(), "lib/..hidden");
    }

    #[test]
    fn test_sanitize_rejects_traversal() {
        for input in [
            "..",
            "../etc/passwd",
            "lib/../../x",
            "lib\\..\\..\\x",
            "/etc/passwd",
            "\\\\server\\share",
            "C:\\Windows",
            "C:",
            "c:/x",
            "",
            ".",
            "./",
            "a\0b",
        ] {
            let err = sanitize_relative_path(input).unwrap_err();
            assert!(
                matches!(
                    err.downcast_ref::<GreaterError>(),
                    Some(GreaterError::PathTraversal { .. })
                ),
                "expected PathTraversal for {input:?}"
            );
        }
    }

    #[test]
    fn test_resolve_joins_exactly() {
        let temp = tempdir().unwrap();
        let resolved = resolve_path_within_dir(temp.path(), "a/b").unwrap();
        assert_eq!(resolved, temp.path().join("a").join("b"));
    }

    #[test]
    fn test_resolve_rejects_escape() {
        let temp = tempdir().unwrap();
        assert!(resolve_path_within_dir(temp.path(), "../outside").is_err());
        assert!(resolve_path_within_dir(temp.path(), "/etc/passwd").is_err());
        assert!(resolve_path_within_dir(temp.path(), "a/../../b").is_err());
    }

    #[test]
    fn test_is_within_dir_boundary() {
        assert!(is_within_dir(Path::new("/base"), Path::new("/base/a")));
        assert!(is_within_dir(Path::new("/base"), Path::new("/base")));
        assert!(is_within_dir(Path::new("/base"), Path::new("/base/a/../b")));
        assert!(!is_within_dir(Path::new("/base"), Path::new("/base-evil/a")));
        assert!(!is_within_dir(Path::new("/base"), Path::new("/base/../x")));
    }

    #[test]
    fn test_relative_base_with_parent_prefix() {
        let base = Path::new("../app");
        let resolved = resolve_path_within_dir(base, "src/lib/Button.svelte").unwrap();
        assert_eq!(resolved, base.join("src").join("lib").join("Button.svelte"));
        assert!(resolve_path_within_dir(base, "../other/x.ts").is_err());

        assert!(is_within_dir(Path::new("../app"), Path::new("../app/a")));
        assert!(is_within_dir(Path::new("../../app"), Path::new("../../app/a/../b")));
        assert!(!is_within_dir(Path::new("../app"), Path::new("../app/../x")));
        assert!(!is_within_dir(Path::new("../app"), Path::new("../../app/a")));
        assert!(!is_within_dir(Path::new("/"), Path::new("/../etc")));
    }

    #[test]
    fn test_absolute_dir_anchors_relative_paths() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(absolute_dir(Path::new("../app")).unwrap(), cwd.join("../app"));
        let temp = tempdir().unwrap();
        assert_eq!(absolute_dir(temp.path()).unwrap(), temp.path());
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_rejects_symlink_escape() {
        let temp = tempdir().unwrap();
        let base = temp.path().join("project");
        let outside = temp.path().join("outside");
        fs::create_dir_all(&base).unwrap();
        fs::create_dir_all(&outside).unwrap();
        std::os::unix::fs::symlink(&outside, base.join("link")).unwrap();

        assert!(resolve_path_within_dir(&base, "link/file.ts").is_err());
        assert!(resolve_path_within_dir(&base, "real/file.ts").is_ok());
    }

    #[test]
    fn test_find_project_root() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("components.json"), "{}").unwrap();
        let nested = temp.path().join("src").join("nested");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_project_root(&nested, "components.json").unwrap(), temp.path());
        assert!(find_project_root(&nested, "missing.json").is_none());
    }
}
