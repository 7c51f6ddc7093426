//! # guardrail-core
//!
//! Core framework for enforcing project architecture rules on a source tree
//! without executing it.
//!
//! This crate provides the pipeline pieces:
//!
//! - [`FileLocator`] for candidate file discovery
//! - [`StructuralParser`] trait and [`StructuralTree`] model
//! - [`LineIndex`] for line mapping and enclosing-function lookups
//! - [`Rule`] and [`ProjectRule`] traits for pluggable checks
//! - [`Engine`] for orchestrating a scan into a [`Report`]
//!
//! ## Example
//!
//! ```ignore
//! use guardrail_core::{Config, Engine};
//!
//! let engine = Engine::builder()
//!     .project_dir(".")
//!     .config(Config::default())
//!     .parser(MyParser::new())
//!     .rule(MyRule::new())
//!     .build()?;
//!
//! let report = engine.run()?;
//! if !report.is_success() {
//!     eprintln!("{}", report.render());
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod context;
mod engine;
mod line_index;
mod locator;
mod rule;
mod tree;
mod types;

/// Utility modules for rule implementations.
pub mod utils;

pub use config::{
    AccessPointConfig, AllowEntry, AnalyzerConfig, BoundedResultsConfig, Config, ConfigError,
    RegistrationConfig, RuleConfig, MAX_WINDOW,
};
pub use context::{FileContext, ProjectContext};
pub use engine::{Engine, EngineBuilder, EngineError};
pub use line_index::LineIndex;
pub use locator::{is_test_file, FileLocator, LocatorError};
pub use rule::{ProjectRule, ProjectRuleBox, Rule, RuleBox, Signal};
pub use tree::{
    Call, Declaration, DeclarationKind, FunctionDef, Import, ImportStyle, ImportedName,
    ParseFailure, StructuralParser, StructuralTree,
};
pub use types::{Location, Report, RuleSummary, Suggestion, Violation};
