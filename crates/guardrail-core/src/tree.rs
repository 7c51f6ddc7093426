//! Language-agnostic structural tree and the parser trait.
//!
//! [`StructuralParser`] is the extension point for adding new languages.
//! Implementations turn raw source text into a [`StructuralTree`] holding the
//! declarations rules care about: imports, function boundaries and calls.

use serde::Serialize;
use std::path::Path;

/// Kind of a [`Declaration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclarationKind {
    /// `import x` / `from x import y`
    Import,
    /// `def f(): ...` / `async def f(): ...`
    Function,
    /// `f(...)` / `obj.method(...)`
    Call,
}

/// A name bound by an import statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportedName {
    /// Imported name as written (`a.b` for `import a.b`, `z` for `from x import z`).
    pub name: String,
    /// Local alias (`as` clause), if any.
    pub alias: Option<String>,
}

/// Syntactic form of an import statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStyle {
    /// `import a, b.c as d`
    Module,
    /// `from m import n`
    From,
}

/// A single import statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Import {
    /// Line of the statement (1-indexed).
    pub line: usize,
    /// Statement form.
    pub style: ImportStyle,
    /// Source module of a `from` import (`None` for `import` statements and `from . import x`).
    pub module: Option<String>,
    /// Number of leading dots of a relative `from` import.
    pub level: usize,
    /// Names bound by the statement. `*` for wildcard imports.
    pub names: Vec<ImportedName>,
}

impl Import {
    /// Returns true for relative imports (`from . import x`, `from .db import y`).
    #[must_use]
    pub fn is_relative(&self) -> bool {
        self.level > 0
    }

    /// Absolute dotted module paths this statement reaches.
    ///
    /// `import a.b, c` gives `a.b` and `c`; `from m import n` gives `m` and
    /// `m.n`. Relative imports give nothing.
    #[must_use]
    pub fn module_paths(&self) -> Vec<String> {
        if self.is_relative() {
            return Vec::new();
        }
        match self.style {
            ImportStyle::Module => self.names.iter().map(|n| n.name.clone()).collect(),
            ImportStyle::From => {
                let Some(module) = &self.module else {
                    return Vec::new();
                };
                let mut paths = vec![module.clone()];
                paths.extend(
                    self.names
                        .iter()
                        .filter(|n| n.name != "*")
                        .map(|n| format!("{module}.{}", n.name)),
                );
                paths
            }
        }
    }
}

/// A function or method definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionDef {
    /// Function name.
    pub name: String,
    /// Line of the `def` keyword (1-indexed).
    pub start_line: usize,
    /// Last line of the body (1-indexed, inclusive).
    pub end_line: usize,
    /// Whether this is an `async def`.
    pub is_async: bool,
}

impl FunctionDef {
    /// Returns true if `line` falls within this definition.
    #[must_use]
    pub fn contains(&self, line: usize) -> bool {
        self.start_line <= line && line <= self.end_line
    }

    /// Number of lines spanned.
    #[must_use]
    pub fn span(&self) -> usize {
        self.end_line - self.start_line
    }
}

/// A call expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Call {
    /// Line of the called name (1-indexed).
    pub line: usize,
    /// Called attribute/method name (`all` for `q.all()`) or function name.
    pub name: String,
    /// Receiver expression text for attribute calls (`q` for `q.all()`).
    pub receiver: Option<String>,
}

/// One node of a [`StructuralTree`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Declaration {
    /// Import statement.
    Import(Import),
    /// Function definition.
    Function(FunctionDef),
    /// Call expression.
    Call(Call),
}

impl Declaration {
    /// Node kind.
    #[must_use]
    pub fn kind(&self) -> DeclarationKind {
        match self {
            Self::Import(_) => DeclarationKind::Import,
            Self::Function(_) => DeclarationKind::Function,
            Self::Call(_) => DeclarationKind::Call,
        }
    }

    /// Textual identifier: imported module, function name or called name.
    #[must_use]
    pub fn identifier(&self) -> &str {
        match self {
            Self::Import(i) => i
                .module
                .as_deref()
                .or_else(|| i.names.first().map(|n| n.name.as_str()))
                .unwrap_or(""),
            Self::Function(f) => &f.name,
            Self::Call(c) => &c.name,
        }
    }

    /// First line of the node (1-indexed).
    #[must_use]
    pub fn start_line(&self) -> usize {
        match self {
            Self::Import(i) => i.line,
            Self::Function(f) => f.start_line,
            Self::Call(c) => c.line,
        }
    }

    /// Last line, only known for function definitions.
    #[must_use]
    pub fn end_line(&self) -> Option<usize> {
        match self {
            Self::Function(f) => Some(f.end_line),
            _ => None,
        }
    }
}

/// Parsed structure of one source file, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StructuralTree {
    declarations: Vec<Declaration>,
}

impl StructuralTree {
    /// Creates a tree from declarations in document order.
    #[must_use]
    pub fn new(declarations: Vec<Declaration>) -> Self {
        Self { declarations }
    }

    /// All declarations.
    #[must_use]
    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    /// Import statements.
    pub fn imports(&self) -> impl Iterator<Item = &Import> {
        self.declarations.iter().filter_map(|d| match d {
            Declaration::Import(i) => Some(i),
            _ => None,
        })
    }

    /// Function and method definitions, nested ones included.
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDef> {
        self.declarations.iter().filter_map(|d| match d {
            Declaration::Function(f) => Some(f),
            _ => None,
        })
    }

    /// Call expressions.
    pub fn calls(&self) -> impl Iterator<Item = &Call> {
        self.declarations.iter().filter_map(|d| match d {
            Declaration::Call(c) => Some(c),
            _ => None,
        })
    }

    /// Returns true if the tree has no declarations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

/// Why a file could not be turned into a [`StructuralTree`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFailure {
    /// Source is syntactically malformed.
    #[error("syntax error near line {line}")]
    Syntax {
        /// First line containing an error (1-indexed).
        line: usize,
    },
    /// Source is not valid UTF-8.
    #[error("file is not valid UTF-8")]
    Encoding,
    /// The parser could not be initialised.
    #[error("parser unavailable: {0}")]
    Parser(String),
}

/// Trait for language-specific structural parsing.
///
/// Implementations must be pure: the same text always yields the same tree,
/// and the source is never executed.
pub trait StructuralParser: Send + Sync {
    /// Language identifier (e.g., `"python"`).
    fn language_id(&self) -> &'static str;

    /// File extensions handled, without the dot (e.g., `&["py"]`).
    fn extensions(&self) -> &'static [&'static str];

    /// Parses one file's text.
    ///
    /// # Errors
    ///
    /// Returns [`ParseFailure`] if the text is malformed.
    fn parse(&self, path: &Path, source: &str) -> Result<StructuralTree, ParseFailure>;
}
