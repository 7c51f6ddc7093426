//! Line bookkeeping for one source file.

use std::ops::Range;

use crate::tree::{FunctionDef, StructuralTree};

/// Maps byte offsets to 1-based lines and lines to their enclosing function.
#[derive(Debug, Clone, Default)]
pub struct LineIndex {
    /// Byte offset at which each line starts.
    line_starts: Vec<usize>,
    /// Total length of the indexed text.
    len: usize,
    /// End of the last line, excluding a trailing newline.
    text_end: usize,
    /// Every function definition in the file.
    functions: Vec<FunctionDef>,
}

impl LineIndex {
    /// Builds the index for `content`, using `tree` for function boundaries.
    ///
    /// Without a tree (unparsable file) every line is at module scope.
    #[must_use]
    pub fn new(content: &str, tree: Option<&StructuralTree>) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            content
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        // A trailing newline does not open a new line.
        if line_starts.len() > 1 && line_starts.last() == Some(&content.len()) {
            line_starts.pop();
        }

        let functions = tree
            .map(|t| t.functions().cloned().collect())
            .unwrap_or_default();

        Self {
            line_starts,
            len: content.len(),
            text_end: content.strip_suffix('\n').map_or(content.len(), str::len),
            functions,
        }
    }

    /// Number of lines in the text.
    #[must_use]
    pub fn line_count(&self) -> usize {
        if self.len == 0 {
            0
        } else {
            self.line_starts.len()
        }
    }

    /// Line (1-indexed) containing the given byte offset.
    #[must_use]
    pub fn line_at(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(i) => i + 1,
            Err(i) => i,
        }
    }

    /// Byte range of a line (1-indexed), without its newline.
    ///
    /// Returns `None` for line 0 or lines past the end.
    #[must_use]
    pub fn line_span(&self, line: usize) -> Option<Range<usize>> {
        if line == 0 || line > self.line_count() {
            return None;
        }
        let start = self.line_starts[line - 1];
        let end = self
            .line_starts
            .get(line)
            .map_or(self.text_end, |next| next.saturating_sub(1));
        Some(start..end.max(start))
    }

    /// Byte range covering lines `first..=last`, clamped to the text.
    #[must_use]
    pub fn lines_span(&self, first: usize, last: usize) -> Range<usize> {
        let first = first.max(1);
        let last = last.min(self.line_count());
        match (self.line_span(first), self.line_span(last)) {
            (Some(a), Some(b)) if first <= last => a.start..b.end,
            _ => 0..0,
        }
    }

    /// Name of the innermost function whose line range contains `line`.
    ///
    /// Nested definitions resolve to the smallest enclosing range.
    #[must_use]
    pub fn enclosing_function(&self, line: usize) -> Option<&str> {
        self.functions
            .iter()
            .filter(|f| f.contains(line))
            .min_by_key(|f| f.span())
            .map(|f| f.name.as_str())
    }
}
