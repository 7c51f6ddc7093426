//! # guardrail-rules
//!
//! Built-in architecture rules for Python services.
//!
//! ## Available Rules
//!
//! | Code | Name | Signal | Description |
//! |------|------|--------|-------------|
//! | GR001 | `single-access-point` | tree | Only the access module may import database drivers |
//! | GR002 | `bounded-results` | text | Multi-row queries must be paginated nearby |
//! | GR003 | `registration-consistency` | project | Every handler module is registered |
//!
//! ## Usage
//!
//! ```ignore
//! use guardrail_core::Config;
//!
//! let report = guardrail_rules::run(Path::new("."), &Config::default())?;
//! print!("{}", report.render());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bounded_results;
mod catalog;
pub mod registration;
pub mod single_access_point;

pub use bounded_results::BoundedResults;
pub use catalog::{Catalog, CatalogEntry, RuleKind};
pub use registration::RegistrationConsistency;
pub use single_access_point::SingleAccessPoint;

/// Re-export core types for convenience.
pub use guardrail_core::{Config, EngineError, ProjectRule, Report, Rule, Violation};

use std::path::Path;

/// Scans a Python project with every built-in rule.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the scan root cannot
/// be walked. Unreadable or unparsable files never fail the scan.
pub fn run(project_dir: &Path, config: &Config) -> Result<Report, EngineError> {
    Catalog::from_config(config)?.run(project_dir, config)
}
