//! Candidate source file discovery.

use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::utils::paths::{normalize, to_slash};

/// Errors raised while walking a directory.
#[derive(Debug, thiserror::Error)]
#[error("failed to walk {path}: {source}")]
pub struct LocatorError {
    /// Path that could not be read.
    pub path: PathBuf,
    /// Underlying walk error.
    pub source: walkdir::Error,
}

/// Walks directories and yields candidate source files.
///
/// Skips denylisted directories (build output, dependencies, version
/// control), test files (`test_*`, `*_test.<ext>`) and paths matching
/// exclude globs. Files come out sorted by path.
#[derive(Debug, Clone)]
pub struct FileLocator {
    extensions: Vec<String>,
    exclude_dirs: Vec<String>,
    exclude_globs: Vec<glob::Pattern>,
    base: PathBuf,
}

impl FileLocator {
    /// Creates a locator for files with the given extensions (without dot).
    #[must_use]
    pub fn new(extensions: &[&str]) -> Self {
        Self {
            extensions: extensions.iter().map(|e| (*e).to_string()).collect(),
            exclude_dirs: Vec::new(),
            exclude_globs: Vec::new(),
            base: PathBuf::new(),
        }
    }

    /// Sets the directory names that are never descended into.
    #[must_use]
    pub fn exclude_dirs<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_dirs = names.into_iter().map(Into::into).collect();
        self
    }

    /// Adds exclude globs matched against paths relative to `base`.
    ///
    /// Invalid patterns are ignored; configuration validation rejects them
    /// earlier.
    #[must_use]
    pub fn exclude_globs<I, S>(mut self, base: &Path, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.base = normalize(base);
        self.exclude_globs = patterns
            .into_iter()
            .filter_map(|p| glob::Pattern::new(p.as_ref()).ok())
            .collect();
        self
    }

    /// Lazily enumerates candidate files under `root`.
    ///
    /// A missing root yields nothing. Unreadable directories yield an error.
    pub fn locate<'a>(
        &'a self,
        root: &Path,
    ) -> impl Iterator<Item = Result<PathBuf, LocatorError>> + 'a {
        let walker = root.exists().then(|| {
            WalkDir::new(root)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(move |entry| {
                    entry.depth() == 0
                        || !entry.file_type().is_dir()
                        || !self.is_excluded_dir(entry.file_name())
                })
        });

        let root = root.to_path_buf();
        walker.into_iter().flatten().filter_map(move |entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(source) => {
                    let path = source.path().map_or_else(|| root.clone(), Path::to_path_buf);
                    return Some(Err(LocatorError { path, source }));
                }
            };
            if !entry.file_type().is_file() {
                return None;
            }
            let path = entry.into_path();
            if self.is_candidate(&path) {
                Some(Ok(path))
            } else {
                debug!("Excluding: {}", path.display());
                None
            }
        })
    }

    /// Collects [`Self::locate`] into a sorted list.
    ///
    /// # Errors
    ///
    /// Returns the first walk error.
    pub fn collect(&self, root: &Path) -> Result<Vec<PathBuf>, LocatorError> {
        let mut files = self.locate(root).collect::<Result<Vec<_>, _>>()?;
        files.sort();
        Ok(files)
    }

    fn is_excluded_dir(&self, name: &std::ffi::OsStr) -> bool {
        let name = name.to_string_lossy();
        self.exclude_dirs.iter().any(|d| *d == name)
    }

    fn is_candidate(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        if !self.extensions.iter().any(|e| e == ext) {
            return false;
        }
        if is_test_file(path) {
            return false;
        }
        if self.exclude_globs.is_empty() {
            return true;
        }
        let normalized = normalize(path);
        let relative = normalized
            .strip_prefix(&self.base)
            .unwrap_or(&normalized);
        let relative = to_slash(relative);
        !self.exclude_globs.iter().any(|g| g.matches(&relative))
    }
}

/// Detects test files by name convention (`test_*`, `*_test.<ext>`).
#[must_use]
pub fn is_test_file(path: &Path) -> bool {
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return false;
    };
    stem.starts_with("test_") || stem.ends_with("_test")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn locator() -> FileLocator {
        FileLocator::new(&["py"]).exclude_dirs(["__pycache__", ".venv", ".git"])
    }

    fn relative(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| to_slash(f.strip_prefix(root).unwrap()))
            .collect()
    }

    #[test]
    fn test_detect_test_file() {
        assert!(is_test_file(Path::new("src/test_orders.py")));
        assert!(is_test_file(Path::new("src/orders_test.py")));
        assert!(!is_test_file(Path::new("src/orders.py")));
        assert!(!is_test_file(Path::new("src/contest.py")));
    }

    #[test]
    fn test_missing_root_is_empty() {
        let tmp = TempDir::new().unwrap();
        let files = locator().collect(&tmp.path().join("nope")).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_applies_exclusions_and_sorts() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(root, "b.py");
        touch(root, "a/z.py");
        touch(root, "a.py");
        touch(root, "a/test_z.py");
        touch(root, "a/z_test.py");
        touch(root, "notes.txt");
        touch(root, "__pycache__/a.py");
        touch(root, ".venv/lib/site.py");
        touch(root, "pkg/.git/hook.py");

        let files = locator().collect(root).unwrap();
        assert_eq!(relative(root, &files), vec!["a/z.py", "a.py", "b.py"]);
    }

    #[test]
    fn test_lazy_order_matches_sorted_order() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        for rel in ["m/n.py", "m.py", "l/x/y.py", "z.py"] {
            touch(root, rel);
        }
        let lazy: Vec<PathBuf> = locator().locate(root).map(Result::unwrap).collect();
        let sorted = locator().collect(root).unwrap();
        assert_eq!(lazy, sorted);
    }

    #[test]
    fn test_exclude_globs_are_project_relative() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(root, "src/generated/models.py");
        touch(root, "src/app.py");

        let files = locator()
            .exclude_globs(root, ["src/generated/**"])
            .collect(&root.join("src"))
            .unwrap();
        assert_eq!(relative(root, &files), vec!["src/app.py"]);
    }

    #[test]
    fn test_denylist_is_relative_to_root() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("build");
        touch(&root, "app.py");
        let files = FileLocator::new(&["py"])
            .exclude_dirs(["build"])
            .collect(&root)
            .unwrap();
        assert_eq!(files.len(), 1);
    }
}
