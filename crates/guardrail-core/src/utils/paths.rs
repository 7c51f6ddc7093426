//! Path utilities shared by the locator, engine and rules.

use std::path::{Component, Path, PathBuf};

/// Lexically normalizes a filesystem path.
///
/// Drops `.` components and folds `..` into the preceding component. The
/// filesystem is never consulted, so symlinks are not resolved.
///
/// ```ignore
/// assert_eq!(normalize(Path::new("./src/../src/db/client.py")), PathBuf::from("src/db/client.py"));
/// ```
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Checks whether a dotted module path is `module` itself or one of its submodules.
///
/// # Examples
///
/// ```ignore
/// assert!(is_dotted_prefix("psycopg2", "psycopg2.extras"));
/// assert!(!is_dotted_prefix("psycopg2", "psycopg2_pool"));
/// ```
#[must_use]
pub fn is_dotted_prefix(module: &str, path: &str) -> bool {
    path == module
        || (path.starts_with(module) && path.as_bytes().get(module.len()) == Some(&b'.'))
}

/// Renders a path with forward slashes regardless of platform.
#[must_use]
pub fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
