//! Rule confining database drivers to one designated module.
//!
//! # Rationale
//!
//! When any module can open its own connection, pooling, timeouts and
//! retry behaviour fork silently. Routing every query through one access
//! module keeps those decisions in one place.
//!
//! # Detected Patterns
//!
//! - `import psycopg2`, `import psycopg2.extras as ex`
//! - `from sqlalchemy import create_engine`
//! - `from sqlalchemy.engine import Engine`
//!
//! Relative imports (`from .db import client`) are never flagged.
//!
//! # Good Patterns
//!
//! ```python
//! from src.db.client import fetch_orders
//! ```

use guardrail_core::utils::{is_dotted_prefix, normalize};
use guardrail_core::{
    AccessPointConfig, FileContext, Import, Location, Rule, Signal, StructuralTree, Suggestion,
    Violation,
};
use std::path::PathBuf;

/// Rule code for single-access-point.
pub const CODE: &str = "GR001";

/// Rule name for single-access-point.
pub const NAME: &str = "single-access-point";

/// Forbids importing database drivers outside the access module.
#[derive(Debug, Clone)]
pub struct SingleAccessPoint {
    module: PathBuf,
    forbidden: Vec<String>,
}

impl Default for SingleAccessPoint {
    fn default() -> Self {
        Self::new()
    }
}

impl SingleAccessPoint {
    /// Creates a new rule with the default access module and drivers.
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(&AccessPointConfig::default())
    }

    /// Creates the rule from configuration.
    #[must_use]
    pub fn from_config(config: &AccessPointConfig) -> Self {
        Self {
            module: normalize(&config.module),
            forbidden: config.forbidden.clone(),
        }
    }

    /// Forbidden entries reached by an import, in configuration order.
    fn offending<'a>(&'a self, import: &Import) -> Vec<&'a str> {
        let paths = import.module_paths();
        self.forbidden
            .iter()
            .filter(|f| paths.iter().any(|p| is_dotted_prefix(f, p)))
            .map(String::as_str)
            .collect()
    }
}

impl Rule for SingleAccessPoint {
    fn name(&self) -> &'static str {
        NAME
    }

    fn code(&self) -> &'static str {
        CODE
    }

    fn description(&self) -> &'static str {
        "Only the designated access module may import database drivers"
    }

    fn remediation(&self) -> String {
        format!(
            "Move the query into {} and call it from there. Opening connections elsewhere bypasses pooling and timeouts.",
            self.module.display()
        )
    }

    fn signal(&self) -> Signal {
        Signal::Tree
    }

    fn check(&self, ctx: &FileContext<'_>, tree: Option<&StructuralTree>) -> Vec<Violation> {
        let Some(tree) = tree else {
            return Vec::new();
        };
        if ctx.relative_path == self.module {
            return Vec::new();
        }

        tree.imports()
            .filter_map(|import| {
                let offending = self.offending(import);
                if offending.is_empty() {
                    return None;
                }
                let names = offending
                    .iter()
                    .map(|m| format!("'{m}'"))
                    .collect::<Vec<_>>()
                    .join(", ");
                Some(
                    Violation::new(
                        CODE,
                        NAME,
                        Location::new(ctx.relative_path.clone(), import.line),
                        format!(
                            "Direct import of {names} outside {}",
                            self.module.display()
                        ),
                    )
                    .with_suggestion(Suggestion::new(format!(
                        "use the functions in {} instead",
                        self.module.display()
                    ))),
                )
            })
            .collect()
    }
}
