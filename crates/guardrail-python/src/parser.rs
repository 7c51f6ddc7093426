//! Python structural parser using Tree-sitter.

use std::path::Path;
use tracing::trace;
use tree_sitter::{Language, Node, Parser};

use guardrail_core::{
    Call, Declaration, FunctionDef, Import, ImportStyle, ImportedName, ParseFailure,
    StructuralParser, StructuralTree,
};

/// Extracts imports, function definitions and calls from Python source.
///
/// The whole tree is walked, so imports and functions nested in classes or
/// other functions are reported as well. Source is never executed.
pub struct PythonParser {
    language: Language,
}

impl PythonParser {
    /// Creates a new Python parser.
    #[must_use]
    pub fn new() -> Self {
        Self {
            language: tree_sitter_python::LANGUAGE.into(),
        }
    }

    fn text<'a>(node: &Node<'_>, src: &'a [u8]) -> &'a str {
        node.utf8_text(src).unwrap_or("")
    }

    fn line(node: &Node<'_>) -> usize {
        node.start_position().row + 1
    }

    /// Reads a `dotted_name` or `aliased_import` node.
    fn imported_name(node: &Node<'_>, src: &[u8]) -> Option<ImportedName> {
        match node.kind() {
            "dotted_name" => Some(ImportedName {
                name: Self::text(node, src).to_owned(),
                alias: None,
            }),
            "aliased_import" => {
                let name = node.child_by_field_name("name")?;
                let alias = node.child_by_field_name("alias");
                Some(ImportedName {
                    name: Self::text(&name, src).to_owned(),
                    alias: alias.map(|a| Self::text(&a, src).to_owned()),
                })
            }
            _ => None,
        }
    }

    fn extract_import(node: &Node<'_>, src: &[u8]) -> Import {
        let mut cursor = node.walk();
        let names = node
            .children_by_field_name("name", &mut cursor)
            .filter_map(|n| Self::imported_name(&n, src))
            .collect();

        Import {
            line: Self::line(node),
            style: ImportStyle::Module,
            module: None,
            level: 0,
            names,
        }
    }

    fn extract_from_import(node: &Node<'_>, src: &[u8]) -> Import {
        let mut module = None;
        let mut level = 0;

        if let Some(module_node) = node.child_by_field_name("module_name") {
            match module_node.kind() {
                "relative_import" => {
                    let mut cursor = module_node.walk();
                    for child in module_node.children(&mut cursor) {
                        match child.kind() {
                            "import_prefix" => level = Self::text(&child, src).matches('.').count(),
                            "dotted_name" => module = Some(Self::text(&child, src).to_owned()),
                            _ => {}
                        }
                    }
                }
                _ => module = Some(Self::text(&module_node, src).to_owned()),
            }
        }

        let mut cursor = node.walk();
        let mut names: Vec<ImportedName> = node
            .children_by_field_name("name", &mut cursor)
            .filter_map(|n| Self::imported_name(&n, src))
            .collect();

        if node
            .children(&mut cursor)
            .any(|c| c.kind() == "wildcard_import")
        {
            names.push(ImportedName {
                name: "*".to_owned(),
                alias: None,
            });
        }

        Import {
            line: Self::line(node),
            style: ImportStyle::From,
            module,
            level,
            names,
        }
    }

    fn extract_function(node: &Node<'_>, src: &[u8]) -> Option<FunctionDef> {
        let name = node.child_by_field_name("name")?;
        let mut cursor = node.walk();
        let is_async = node.children(&mut cursor).any(|c| c.kind() == "async");

        Some(FunctionDef {
            name: Self::text(&name, src).to_owned(),
            start_line: Self::line(node),
            end_line: node.end_position().row + 1,
            is_async,
        })
    }

    fn extract_call(node: &Node<'_>, src: &[u8]) -> Option<Call> {
        let function = node.child_by_field_name("function")?;
        match function.kind() {
            "attribute" => {
                let attribute = function.child_by_field_name("attribute")?;
                let object = function.child_by_field_name("object");
                Some(Call {
                    line: Self::line(&attribute),
                    name: Self::text(&attribute, src).to_owned(),
                    receiver: object.map(|o| Self::text(&o, src).to_owned()),
                })
            }
            "identifier" => Some(Call {
                line: Self::line(&function),
                name: Self::text(&function, src).to_owned(),
                receiver: None,
            }),
            _ => None,
        }
    }

    /// Line of the first error or missing node, in document order.
    fn first_error_line(root: Node<'_>) -> usize {
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if node.is_error() || node.is_missing() {
                return Self::line(&node);
            }
            if node.has_error() {
                let mut cursor = node.walk();
                let children: Vec<_> = node.children(&mut cursor).collect();
                stack.extend(children.into_iter().rev());
            }
        }
        Self::line(&root)
    }
}

impl Default for PythonParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StructuralParser for PythonParser {
    fn language_id(&self) -> &'static str {
        "python"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["py"]
    }

    fn parse(&self, path: &Path, source: &str) -> Result<StructuralTree, ParseFailure> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| ParseFailure::Parser(e.to_string()))?;

        let src = source.as_bytes();
        let tree = parser
            .parse(src, None)
            .ok_or_else(|| ParseFailure::Parser("parse was cancelled".to_owned()))?;
        let root = tree.root_node();

        if root.has_error() {
            return Err(ParseFailure::Syntax {
                line: Self::first_error_line(root),
            });
        }

        let mut declarations = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            match node.kind() {
                "import_statement" => {
                    declarations.push(Declaration::Import(Self::extract_import(&node, src)));
                    continue;
                }
                "import_from_statement" => {
                    declarations.push(Declaration::Import(Self::extract_from_import(&node, src)));
                    continue;
                }
                // `from __future__ import x` binds compiler flags, not modules.
                "future_import_statement" => continue,
                "function_definition" => {
                    if let Some(def) = Self::extract_function(&node, src) {
                        declarations.push(Declaration::Function(def));
                    }
                }
                "call" => {
                    if let Some(call) = Self::extract_call(&node, src) {
                        declarations.push(Declaration::Call(call));
                    }
                }
                _ => {}
            }

            let mut cursor = node.walk();
            let children: Vec<_> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }

        trace!(
            "Parsed {}: {} declarations",
            path.display(),
            declarations.len()
        );

        Ok(StructuralTree::new(declarations))
    }
}
