//! Rule requiring multi-row queries to be paginated.
//!
//! # Rationale
//!
//! A query that returns every row works on a development database and
//! exhausts memory in production. Any `.all()`/`.filter()` call should be
//! bounded by `.limit()`, `.paginate()` or slicing nearby.
//!
//! # Detection
//!
//! Text based, so it also runs on files that fail to parse. For each line
//! with a multi-row call, the window `lines_before..=lines_after` around it
//! must contain a bounding call. Pure comment lines are ignored.
//!
//! Functions verified to return a single row are listed in the allowlist as
//! `"path/to/file.py:function"`.

use guardrail_core::utils::normalize;
use guardrail_core::{
    AllowEntry, BoundedResultsConfig, ConfigError, FileContext, Location, Rule, Signal,
    StructuralTree, Suggestion, Violation,
};
use regex::Regex;
use std::path::Path;
use tracing::debug;

/// Rule code for bounded-results.
pub const CODE: &str = "GR002";

/// Rule name for bounded-results.
pub const NAME: &str = "bounded-results";

/// Requires pagination near multi-row queries.
#[derive(Debug, Clone)]
pub struct BoundedResults {
    multi_row: Regex,
    bounded: Regex,
    lines_before: usize,
    lines_after: usize,
    allow: Vec<AllowEntry>,
}

impl BoundedResults {
    /// Creates the rule from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if the method names do not form a
    /// valid pattern.
    pub fn from_config(config: &BoundedResultsConfig) -> Result<Self, ConfigError> {
        let multi_row = method_call_pattern(&config.multi_row)
            .ok_or_else(|| ConfigError::Validation("bounded_results.multi_row is empty".into()))?;
        let bounded = match method_call_pattern(&config.bounded) {
            Some(methods) => format!(r"{methods}|\[\s*0?\s*:"),
            None => r"\[\s*0?\s*:".to_string(),
        };

        Ok(Self {
            multi_row: compile(&multi_row)?,
            bounded: compile(&bounded)?,
            lines_before: config.lines_before,
            lines_after: config.lines_after,
            allow: config
                .allow
                .iter()
                .map(|e| AllowEntry::new(normalize(&e.file), e.function.clone()))
                .collect(),
        })
    }

    fn is_allowed(&self, file: &Path, function: &str) -> bool {
        self.allow
            .iter()
            .any(|e| e.file == file && e.function == function)
    }
}

/// `\.(a|b)\s*\(` for the given method names.
fn method_call_pattern(methods: &[String]) -> Option<String> {
    if methods.is_empty() {
        return None;
    }
    let alternatives = methods
        .iter()
        .map(|m| regex::escape(m))
        .collect::<Vec<_>>()
        .join("|");
    Some(format!(r"\.(?:{alternatives})\s*\("))
}

fn compile(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern)
        .map_err(|e| ConfigError::Validation(format!("bounded_results: {e}")))
}

impl Rule for BoundedResults {
    fn name(&self) -> &'static str {
        NAME
    }

    fn code(&self) -> &'static str {
        CODE
    }

    fn description(&self) -> &'static str {
        "Multi-row queries must be bounded by pagination"
    }

    fn remediation(&self) -> String {
        "Add .limit(n), .paginate() or slicing to the query. If the function provably returns one row, add \"file.py:function\" to [bounded_results] allow.".to_string()
    }

    fn signal(&self) -> Signal {
        Signal::Text
    }

    fn check(&self, ctx: &FileContext<'_>, _tree: Option<&StructuralTree>) -> Vec<Violation> {
        let mut violations = Vec::new();
        let mut last_line = 0;

        for found in self.multi_row.find_iter(ctx.content) {
            let line = ctx.lines.line_at(found.start());
            if line == last_line {
                continue;
            }
            last_line = line;

            let text = ctx.line_text(line).unwrap_or("");
            if text.trim_start().starts_with('#') {
                continue;
            }

            let first = line.saturating_sub(self.lines_before).max(1);
            let window = ctx
                .content
                .get(ctx.lines.lines_span(first, line + self.lines_after))
                .unwrap_or("");
            if self.bounded.is_match(window) {
                continue;
            }

            if let Some(function) = ctx.lines.enclosing_function(line) {
                if self.is_allowed(&ctx.relative_path, function) {
                    debug!(
                        "Allowlisted unbounded query in {}:{} ({})",
                        ctx.relative_path.display(),
                        line,
                        function
                    );
                    continue;
                }
            }

            violations.push(
                Violation::new(
                    CODE,
                    NAME,
                    Location::new(ctx.relative_path.clone(), line),
                    format!("Multi-row query without pagination: {}", text.trim()),
                )
                .with_suggestion(Suggestion::new("bound the result set with .limit(n)")),
            );
        }

        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guardrail_core::{LineIndex, StructuralParser};
    use guardrail_python::PythonParser;

    fn rule() -> BoundedResults {
        BoundedResults::from_config(&BoundedResultsConfig::default()).unwrap()
    }

    fn check(rule: &BoundedResults, src: &str) -> Vec<Violation> {
        let path = Path::new("/project/src/users/repository.py");
        let tree = PythonParser::new().parse(path, src).ok();
        let lines = LineIndex::new(src, tree.as_ref());
        let ctx = FileContext::new(path, src, &lines, Path::new("/project"));
        rule.check(&ctx, tree.as_ref())
    }

    fn lines(violations: &[Violation]) -> Vec<usize> {
        violations.iter().map(|v| v.location.line).collect()
    }

    #[test]
    fn flags_unbounded_query() {
        let src = "\
def list_users(session):
    return session.query(User).all()
";
        let violations = check(&rule(), src);
        assert_eq!(lines(&violations), vec![2]);
        assert_eq!(
            violations[0].message,
            "Multi-row query without pagination: return session.query(User).all()"
        );
    }

    #[test]
    fn bounded_within_window_passes() {
        let src = "\
def list_users(session, page):
    q = session.query(User)
    q = q.order_by(User.id)
    q = q.offset(page * 50)
    return q.limit(50)
";
        assert!(check(&rule(), src).is_empty());
    }

    #[test]
    fn bounded_before_the_query_counts() {
        let src = "\
def recent(session):
    limit = session.scalar(max_rows).limit(10)
    rows = session.execute(stmt).all()
    return rows
";
        assert!(check(&rule(), src).is_empty());
    }

    #[test]
    fn bound_outside_window_does_not_count() {
        let src = "\
def report(session):
    rows = session.query(Order).all()
    a = 1
    b = 2
    c = 3
    d = 4
    e = 5
    return rows.limit(10)
";
        assert_eq!(lines(&check(&rule(), src)), vec![2]);
    }

    #[test]
    fn slicing_bounds_the_query() {
        let src = "rows = session.query(User).all()[:100]\nfirst = q.filter(x)[0:1]\n";
        assert!(check(&rule(), src).is_empty());
    }

    #[test]
    fn ignores_comment_lines_and_lookalikes() {
        let src = "\
# users = session.query(User).all()
total = calculate_all(items)
names = obj.all_names()
";
        assert!(check(&rule(), src).is_empty());
    }

    #[test]
    fn one_violation_per_line() {
        let src = "rows = session.query(User).filter(User.active).all()\n";
        assert_eq!(lines(&check(&rule(), src)), vec![1]);
    }

    #[test]
    fn allowlist_suppresses_only_matching_function() {
        let config = BoundedResultsConfig {
            allow: vec![AllowEntry::new("src/users/repository.py", "get_by_id")],
            ..BoundedResultsConfig::default()
        };
        let rule = BoundedResults::from_config(&config).unwrap();
        let src = "\
def get_by_id(session, pk):
    return session.query(User).filter(User.id == pk).one()


def list_all(session):
    return session.query(User).all()
";
        assert_eq!(lines(&check(&rule, src)), vec![6]);
    }

    #[test]
    fn runs_on_unparsable_files() {
        let src = "def broken(:\n    rows = session.query(User).all()\n";
        let path = Path::new("/project/src/bad.py");
        assert!(PythonParser::new().parse(path, src).is_err());
        let lines = LineIndex::new(src, None);
        let ctx = FileContext::new(path, src, &lines, Path::new("/project"));
        assert_eq!(rule().check(&ctx, None).len(), 1);
    }

    #[test]
    fn window_is_configurable() {
        let config = BoundedResultsConfig {
            lines_after: 0,
            ..BoundedResultsConfig::default()
        };
        let rule = BoundedResults::from_config(&config).unwrap();
        let src = "rows = q.all()\nrows = rows.limit(5)\n";
        assert_eq!(lines(&check(&rule, src)), vec![1]);
    }

    #[test]
    fn empty_multi_row_is_rejected() {
        let config = BoundedResultsConfig {
            multi_row: Vec::new(),
            ..BoundedResultsConfig::default()
        };
        assert!(BoundedResults::from_config(&config).is_err());
    }
}
