//! # guardrail-python
//!
//! Tree-sitter powered structural parsing of Python source for guardrail.
//!
//! [`PythonParser`] implements [`guardrail_core::StructuralParser`], turning
//! `.py` files into the language-agnostic
//! [`StructuralTree`](guardrail_core::StructuralTree): imports, function
//! boundaries and calls.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod parser;

pub use parser::PythonParser;
