//! Context types for rule execution.

use std::path::{Path, PathBuf};

use crate::line_index::LineIndex;
use crate::locator::FileLocator;
use crate::utils::paths::normalize;

/// Context provided to per-file rules.
///
/// Bundles one file's identity, raw text and line index. The parsed tree is
/// handed to rules separately since it may be absent.
#[derive(Debug, Clone)]
pub struct FileContext<'a> {
    /// Path of the file on disk.
    pub path: &'a Path,
    /// Normalized path relative to the project directory.
    pub relative_path: PathBuf,
    /// File contents.
    pub content: &'a str,
    /// Line index over `content`.
    pub lines: &'a LineIndex,
}

impl<'a> FileContext<'a> {
    /// Creates a new file context.
    #[must_use]
    pub fn new(path: &'a Path, content: &'a str, lines: &'a LineIndex, project_dir: &Path) -> Self {
        Self {
            path,
            relative_path: relative_to(path, project_dir),
            content,
            lines,
        }
    }

    /// Text of a line (1-indexed), without its newline.
    #[must_use]
    pub fn line_text(&self, line: usize) -> Option<&'a str> {
        self.lines
            .line_span(line)
            .and_then(|span| self.content.get(span))
    }
}

/// Context provided to project-wide rules.
#[derive(Debug, Clone)]
pub struct ProjectContext<'a> {
    /// Project directory every configured path is relative to.
    pub project_dir: &'a Path,
    /// Locator with the run's exclusion rules, for rules that walk other directories.
    pub locator: &'a FileLocator,
    /// Source files found under the scan root.
    pub source_files: Vec<PathBuf>,
}

impl<'a> ProjectContext<'a> {
    /// Creates a new project context.
    #[must_use]
    pub fn new(project_dir: &'a Path, locator: &'a FileLocator) -> Self {
        Self {
            project_dir,
            locator,
            source_files: Vec::new(),
        }
    }

    /// Sets the list of source files.
    #[must_use]
    pub fn with_source_files(mut self, files: Vec<PathBuf>) -> Self {
        self.source_files = files;
        self
    }

    /// Resolves a configured project-relative path.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_dir.join(path)
        }
    }

    /// Normalized path of `path` relative to the project directory.
    #[must_use]
    pub fn relative(&self, path: &Path) -> PathBuf {
        relative_to(path, self.project_dir)
    }
}

fn relative_to(path: &Path, project_dir: &Path) -> PathBuf {
    let path = normalize(path);
    let base = normalize(project_dir);
    path.strip_prefix(&base)
        .map_or_else(|_| path.clone(), Path::to_path_buf)
}
