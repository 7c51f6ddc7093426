//! Core types for violations and scan reports.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::PathBuf;

/// Source code location.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    /// File path relative to the project directory.
    pub file: PathBuf,
    /// Line number (1-indexed).
    pub line: usize,
}

impl Location {
    /// Creates a new location.
    #[must_use]
    pub fn new(file: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

/// A suggested fix for a violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Human-readable description of the fix.
    pub message: String,
}

impl Suggestion {
    /// Creates a new suggestion.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// An architectural breach found during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Rule code (e.g., "GR001").
    pub code: String,
    /// Rule id (e.g., "single-access-point").
    pub rule: String,
    /// Where the breach was found.
    pub location: Location,
    /// Human-readable message.
    pub message: String,
    /// Optional suggestion for fixing this particular site.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<Suggestion>,
}

impl Violation {
    /// Creates a new violation.
    #[must_use]
    pub fn new(
        code: impl Into<String>,
        rule: impl Into<String>,
        location: Location,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            rule: rule.into(),
            location,
            message: message.into(),
            suggestion: None,
        }
    }

    /// Adds a suggestion to this violation.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: Suggestion) -> Self {
        self.suggestion = Some(suggestion);
        self
    }

    /// Ordering key used by [`Report`]: file, line, then rule and message.
    fn sort_key(&self) -> (&PathBuf, usize, &str, &str) {
        (
            &self.location.file,
            self.location.line,
            &self.code,
            &self.message,
        )
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}: [{}] {}",
            self.location.file.display(),
            self.location.line,
            self.code,
            self.message
        )
    }
}

/// Per-rule entry of a [`Report`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSummary {
    /// Rule id.
    pub rule: String,
    /// What the rule checks.
    pub description: String,
    /// How to fix violations of this rule.
    pub remediation: String,
    /// Number of violations reported by this rule.
    pub count: usize,
}

/// Aggregate result of one scan.
///
/// A report without violations is the success state; any violation fails
/// the scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// All violations, ordered by file then line.
    pub violations: Vec<Violation>,
    /// Summaries of every rule that ran, keyed by rule code.
    pub rules: BTreeMap<String, RuleSummary>,
    /// Number of files evaluated.
    pub files_checked: usize,
    /// Number of files that could not be evaluated at all.
    pub files_skipped: usize,
}

impl Report {
    /// Creates a new empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a rule that took part in the scan.
    pub fn register_rule(
        &mut self,
        code: &str,
        rule: &str,
        description: &str,
        remediation: impl Into<String>,
    ) {
        self.rules.entry(code.to_string()).or_insert_with(|| RuleSummary {
            rule: rule.to_string(),
            description: description.to_string(),
            remediation: remediation.into(),
            count: 0,
        });
    }

    /// Sorts violations deterministically and recomputes per-rule counts.
    pub fn finalize(&mut self) {
        self.violations.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        for summary in self.rules.values_mut() {
            summary.count = 0;
        }
        for v in &self.violations {
            if let Some(summary) = self.rules.get_mut(&v.code) {
                summary.count += 1;
            }
        }
    }

    /// Returns true if the scan found no violations.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.violations.is_empty()
    }

    /// Returns violations reported by the given rule code.
    #[must_use]
    pub fn by_rule(&self, code: &str) -> Vec<&Violation> {
        self.violations.iter().filter(|v| v.code == code).collect()
    }

    /// Returns `(code, count)` for every rule that ran.
    #[must_use]
    pub fn counts_by_rule(&self) -> Vec<(&str, usize)> {
        self.rules
            .iter()
            .map(|(code, s)| (code.as_str(), s.count))
            .collect()
    }

    /// Renders the report as a human-readable failure message.
    ///
    /// Violations are grouped by rule, one `path:line — message` line each,
    /// followed by the rule's remediation hint.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();

        if self.is_success() {
            let _ = writeln!(
                out,
                "guardrail: no violations in {} file(s)",
                self.files_checked
            );
            return out;
        }

        let _ = writeln!(
            out,
            "=== guardrail: {} violation(s) ===",
            self.violations.len()
        );

        for (code, summary) in &self.rules {
            let group = self.by_rule(code);
            if group.is_empty() {
                continue;
            }
            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "{} [{}]: {} violation(s)",
                summary.rule,
                code,
                group.len()
            );
            for v in group {
                let _ = writeln!(
                    out,
                    "  {}:{} — {}",
                    v.location.file.display(),
                    v.location.line,
                    v.message
                );
                if let Some(suggestion) = &v.suggestion {
                    let _ = writeln!(out, "    = note: {}", suggestion.message);
                }
            }
            let _ = writeln!(out, "  = help: {}", summary.remediation);
        }

        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Total: {} violation(s) in {} file(s)",
            self.violations.len(),
            self.files_checked
        );
        out
    }
}
