//! Rule traits for defining architecture checks.

use crate::context::{FileContext, ProjectContext};
use crate::tree::StructuralTree;
use crate::types::Violation;

/// Which input a per-file rule relies on.
///
/// The signal determines the rule's soundness: tree rules see exact syntax
/// but are skipped for unparsable files, text rules see every decodable
/// file but only match patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Needs the structural tree; skipped when parsing failed.
    Tree,
    /// Works on raw text; runs on every readable file.
    Text,
}

/// A per-file architecture rule.
///
/// Rules are pure: they never mutate shared state and the same input always
/// yields the same violations.
///
/// # Example
///
/// ```ignore
/// use guardrail_core::{FileContext, Location, Rule, Signal, StructuralTree, Violation};
///
/// pub struct NoPrint;
///
/// impl Rule for NoPrint {
///     fn name(&self) -> &'static str { "no-print" }
///     fn code(&self) -> &'static str { "GR100" }
///     fn remediation(&self) -> String { "Use the logging module.".into() }
///     fn signal(&self) -> Signal { Signal::Tree }
///
///     fn check(&self, ctx: &FileContext, tree: Option<&StructuralTree>) -> Vec<Violation> {
///         let Some(tree) = tree else { return Vec::new() };
///         tree.calls()
///             .filter(|c| c.name == "print" && c.receiver.is_none())
///             .map(|c| Violation::new(self.code(), self.name(),
///                 Location::new(ctx.relative_path.clone(), c.line), "print() call"))
///             .collect()
///     }
/// }
/// ```
pub trait Rule: Send + Sync {
    /// Returns the stable kebab-case id of this rule (e.g., "single-access-point").
    fn name(&self) -> &'static str;

    /// Returns the rule code (e.g., "GR001").
    fn code(&self) -> &'static str;

    /// Returns a brief description of what this rule checks.
    fn description(&self) -> &'static str {
        ""
    }

    /// Returns the fix instruction shown once per rule in reports.
    fn remediation(&self) -> String;

    /// Returns the input this rule relies on.
    fn signal(&self) -> Signal;

    /// Checks a single file and returns any violations found.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The file being checked: path, text and line index
    /// * `tree` - The parsed structure, absent if the file did not parse
    fn check(&self, ctx: &FileContext<'_>, tree: Option<&StructuralTree>) -> Vec<Violation>;
}

/// Type alias for boxed Rule trait objects.
pub type RuleBox = Box<dyn Rule>;

/// A project-wide rule evaluated once per run.
///
/// Useful for conventions spanning files, like "every handler module is
/// registered".
pub trait ProjectRule: Send + Sync {
    /// Returns the stable kebab-case id of this rule.
    fn name(&self) -> &'static str;

    /// Returns the rule code (e.g., "GR003").
    fn code(&self) -> &'static str;

    /// Returns a brief description of what this rule checks.
    fn description(&self) -> &'static str {
        ""
    }

    /// Returns the fix instruction shown once per rule in reports.
    fn remediation(&self) -> String;

    /// Checks the project and returns any violations found.
    fn check_project(&self, ctx: &ProjectContext<'_>) -> Vec<Violation>;
}

/// Type alias for boxed `ProjectRule` trait objects.
pub type ProjectRuleBox = Box<dyn ProjectRule>;
