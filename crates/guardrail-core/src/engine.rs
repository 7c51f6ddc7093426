//! Engine orchestrating one scan: locate, parse, evaluate, aggregate.

use crate::config::{Config, ConfigError};
use crate::context::{FileContext, ProjectContext};
use crate::line_index::LineIndex;
use crate::locator::{FileLocator, LocatorError};
use crate::rule::{ProjectRule, ProjectRuleBox, Rule, RuleBox, Signal};
use crate::tree::{ParseFailure, StructuralParser};
use crate::types::{Report, Violation};

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that abort a scan.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum EngineError {
    /// The configuration is invalid.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    /// The scan root could not be walked.
    #[error(transparent)]
    #[diagnostic(
        code(guardrail::engine::locate),
        help("check that the scan root and its directories are readable")
    )]
    Locator(#[from] LocatorError),

    /// IO error resolving the project directory.
    #[error("IO error: {0}")]
    #[diagnostic(code(guardrail::engine::io))]
    Io(#[from] std::io::Error),

    /// No structural parser was supplied.
    #[error("no structural parser configured")]
    #[diagnostic(code(guardrail::engine::parser))]
    MissingParser,
}

/// Builder for configuring an [`Engine`].
#[derive(Default)]
pub struct EngineBuilder {
    project_dir: Option<PathBuf>,
    config: Option<Config>,
    parser: Option<Box<dyn StructuralParser>>,
    rules: Vec<RuleBox>,
    project_rules: Vec<ProjectRuleBox>,
}

impl EngineBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the project directory all configured paths are relative to.
    #[must_use]
    pub fn project_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.project_dir = Some(path.into());
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the structural parser.
    #[must_use]
    pub fn parser<P: StructuralParser + 'static>(mut self, parser: P) -> Self {
        self.parser = Some(Box::new(parser));
        self
    }

    /// Adds a per-file rule.
    #[must_use]
    pub fn rule<R: Rule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Adds a boxed per-file rule.
    #[must_use]
    pub fn rule_box(mut self, rule: RuleBox) -> Self {
        self.rules.push(rule);
        self
    }

    /// Adds a project-wide rule.
    #[must_use]
    pub fn project_rule<R: ProjectRule + 'static>(mut self, rule: R) -> Self {
        self.project_rules.push(Box::new(rule));
        self
    }

    /// Adds a boxed project-wide rule.
    #[must_use]
    pub fn project_rule_box(mut self, rule: ProjectRuleBox) -> Self {
        self.project_rules.push(rule);
        self
    }

    /// Builds the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, no parser was set,
    /// or the current directory cannot be resolved.
    pub fn build(self) -> Result<Engine, EngineError> {
        let parser = self.parser.ok_or(EngineError::MissingParser)?;
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let project_dir = self.project_dir.unwrap_or_else(|| PathBuf::from("."));
        let project_dir = if project_dir.is_absolute() {
            project_dir
        } else {
            std::env::current_dir()?.join(&project_dir)
        };
        let project_dir = crate::utils::normalize(&project_dir);

        let locator = FileLocator::new(parser.extensions())
            .exclude_dirs(config.analyzer.exclude_dirs.iter().cloned())
            .exclude_globs(&project_dir, &config.analyzer.exclude);

        Ok(Engine {
            project_dir,
            config,
            parser,
            locator,
            rules: self.rules,
            project_rules: self.project_rules,
        })
    }
}

/// Runs every rule over every candidate file and collects a [`Report`].
///
/// Use [`Engine::builder()`] to construct an instance.
pub struct Engine {
    project_dir: PathBuf,
    config: Config,
    parser: Box<dyn StructuralParser>,
    locator: FileLocator,
    rules: Vec<RuleBox>,
    project_rules: Vec<ProjectRuleBox>,
}

impl Engine {
    /// Creates a new builder for configuring an engine.
    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Returns the project directory.
    #[must_use]
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Returns the directory that is scanned.
    #[must_use]
    pub fn scan_root(&self) -> PathBuf {
        self.project_dir.join(&self.config.analyzer.root)
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the number of registered rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len() + self.project_rules.len()
    }

    /// Scans the project and returns the report.
    ///
    /// A file that cannot be read or parsed never aborts the scan.
    ///
    /// # Errors
    ///
    /// Returns an error only if the scan root cannot be walked.
    pub fn run(&self) -> Result<Report, EngineError> {
        let scan_root = self.scan_root();
        info!("Starting scan at {}", scan_root.display());

        let mut report = Report::new();
        self.register_rules(&mut report);

        let files = self.locator.collect(&scan_root)?;
        info!("Found {} files to analyze", files.len());

        for file_path in &files {
            match self.check_file(file_path) {
                Ok(violations) => {
                    report.violations.extend(violations);
                    report.files_checked += 1;
                }
                Err(e) => {
                    warn!("Skipping unreadable {}: {}", file_path.display(), e);
                    report.files_skipped += 1;
                }
            }
        }

        let project_ctx =
            ProjectContext::new(&self.project_dir, &self.locator).with_source_files(files);

        for rule in &self.project_rules {
            if !self.config.is_rule_enabled(rule.name()) {
                debug!("Skipping disabled rule: {}", rule.name());
                continue;
            }
            report.violations.extend(rule.check_project(&project_ctx));
        }

        report.finalize();

        info!(
            "Scan complete: {} violations in {} files",
            report.violations.len(),
            report.files_checked
        );

        Ok(report)
    }

    /// Checks a single file against every enabled per-file rule.
    ///
    /// Invalid UTF-8 is decoded lossily for text rules and counts as a
    /// parse failure, so tree rules are skipped.
    fn check_file(&self, path: &Path) -> std::io::Result<Vec<Violation>> {
        debug!("Analyzing: {}", path.display());

        let bytes = std::fs::read(path)?;
        let (content, parsed) = match String::from_utf8(bytes) {
            Ok(content) => {
                let parsed = self.parser.parse(path, &content);
                (content, parsed)
            }
            Err(e) => (
                String::from_utf8_lossy(e.as_bytes()).into_owned(),
                Err(ParseFailure::Encoding),
            ),
        };

        let tree = match parsed {
            Ok(tree) => Some(tree),
            Err(e) => {
                warn!(
                    "Failed to parse {}: {}; tree-based rules skipped",
                    path.display(),
                    e
                );
                None
            }
        };

        let lines = LineIndex::new(&content, tree.as_ref());
        let ctx = FileContext::new(path, &content, &lines, &self.project_dir);
        let mut violations = Vec::new();

        for rule in &self.rules {
            if !self.config.is_rule_enabled(rule.name()) {
                debug!("Skipping disabled rule: {}", rule.name());
                continue;
            }
            if rule.signal() == Signal::Tree && tree.is_none() {
                continue;
            }
            violations.extend(rule.check(&ctx, tree.as_ref()));
        }

        Ok(violations)
    }

    fn register_rules(&self, report: &mut Report) {
        for rule in &self.rules {
            if self.config.is_rule_enabled(rule.name()) {
                report.register_rule(
                    rule.code(),
                    rule.name(),
                    rule.description(),
                    rule.remediation(),
                );
            }
        }
        for rule in &self.project_rules {
            if self.config.is_rule_enabled(rule.name()) {
                report.register_rule(
                    rule.code(),
                    rule.name(),
                    rule.description(),
                    rule.remediation(),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleConfig;
    use crate::tree::{Declaration, FunctionDef, StructuralTree};
    use crate::types::Location;
    use std::fs;
    use tempfile::TempDir;

    /// Treats `def name` lines as one-line functions; `!!` is a syntax error.
    struct StubParser;

    impl StructuralParser for StubParser {
        fn language_id(&self) -> &'static str {
            "stub"
        }
        fn extensions(&self) -> &'static [&'static str] {
            &["py"]
        }
        fn parse(&self, _path: &Path, source: &str) -> Result<StructuralTree, ParseFailure> {
            let mut decls = Vec::new();
            for (i, line) in source.lines().enumerate() {
                if line.contains("!!") {
                    return Err(ParseFailure::Syntax { line: i + 1 });
                }
                if let Some(name) = line.strip_prefix("def ") {
                    decls.push(Declaration::Function(FunctionDef {
                        name: name.trim().to_string(),
                        start_line: i + 1,
                        end_line: i + 1,
                        is_async: false,
                    }));
                }
            }
            Ok(StructuralTree::new(decls))
        }
    }

    /// Flags every function definition.
    struct FunctionRule;

    impl Rule for FunctionRule {
        fn name(&self) -> &'static str {
            "tree-rule"
        }
        fn code(&self) -> &'static str {
            "T001"
        }
        fn remediation(&self) -> String {
            "remove functions".into()
        }
        fn signal(&self) -> Signal {
            Signal::Tree
        }
        fn check(&self, ctx: &FileContext<'_>, tree: Option<&StructuralTree>) -> Vec<Violation> {
            let Some(tree) = tree else {
                return Vec::new();
            };
            tree.functions()
                .map(|f| {
                    Violation::new(
                        self.code(),
                        self.name(),
                        Location::new(ctx.relative_path.clone(), f.start_line),
                        format!("function {}", f.name),
                    )
                })
                .collect()
        }
    }

    /// Flags every line containing `TODO`.
    struct TodoRule;

    impl Rule for TodoRule {
        fn name(&self) -> &'static str {
            "text-rule"
        }
        fn code(&self) -> &'static str {
            "T002"
        }
        fn remediation(&self) -> String {
            "resolve TODOs".into()
        }
        fn signal(&self) -> Signal {
            Signal::Text
        }
        fn check(&self, ctx: &FileContext<'_>, _tree: Option<&StructuralTree>) -> Vec<Violation> {
            ctx.content
                .lines()
                .enumerate()
                .filter(|(_, l)| l.contains("TODO"))
                .map(|(i, _)| {
                    Violation::new(
                        self.code(),
                        self.name(),
                        Location::new(ctx.relative_path.clone(), i + 1),
                        "todo",
                    )
                })
                .collect()
        }
    }

    /// Emits a single project-level violation.
    struct CountingProjectRule;

    impl ProjectRule for CountingProjectRule {
        fn name(&self) -> &'static str {
            "project-rule"
        }
        fn code(&self) -> &'static str {
            "T003"
        }
        fn remediation(&self) -> String {
            "n/a".into()
        }
        fn check_project(&self, ctx: &ProjectContext<'_>) -> Vec<Violation> {
            vec![Violation::new(
                self.code(),
                self.name(),
                Location::new("project", 0),
                format!("{} files", ctx.source_files.len()),
            )]
        }
    }

    fn write(root: &Path, rel: &str, content: &[u8]) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn engine(root: &Path, config: Config) -> Engine {
        Engine::builder()
            .project_dir(root)
            .config(config)
            .parser(StubParser)
            .rule(FunctionRule)
            .rule(TodoRule)
            .project_rule(CountingProjectRule)
            .build()
            .expect("engine should build")
    }

    #[test]
    fn test_missing_parser_is_an_error() {
        let result = Engine::builder().build();
        assert!(matches!(result, Err(EngineError::MissingParser)));
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let mut config = Config::default();
        config.bounded_results.multi_row.clear();
        let result = Engine::builder().parser(StubParser).config(config).build();
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn test_missing_root_yields_empty_report() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.rules.insert(
            "project-rule".into(),
            RuleConfig {
                enabled: Some(false),
            },
        );
        let report = engine(tmp.path(), config).run().unwrap();
        assert!(report.is_success());
        assert_eq!(report.files_checked, 0);
    }

    #[test]
    fn test_parse_failure_skips_tree_rules_only() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/ok.py", b"def good\n# TODO\n");
        write(tmp.path(), "src/broken.py", b"def bad\n!!\n# TODO\n");

        let report = engine(tmp.path(), Config::default()).run().unwrap();

        assert_eq!(report.files_checked, 2);
        let tree_hits = report.by_rule("T001");
        assert_eq!(tree_hits.len(), 1);
        assert_eq!(tree_hits[0].location.file, Path::new("src/ok.py"));

        let text_hits: Vec<_> = report
            .by_rule("T002")
            .iter()
            .map(|v| (v.location.file.clone(), v.location.line))
            .collect();
        assert_eq!(
            text_hits,
            vec![
                (PathBuf::from("src/broken.py"), 3),
                (PathBuf::from("src/ok.py"), 2)
            ]
        );
    }

    #[test]
    fn test_undecodable_file_gets_text_rules_only() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/latin1.py", b"def caf\xe9\n# TODO\n");
        write(tmp.path(), "src/ok.py", b"x = 1\n");

        let report = engine(tmp.path(), Config::default()).run().unwrap();
        assert_eq!(report.files_checked, 2);
        assert_eq!(report.files_skipped, 0);
        assert!(report.by_rule("T001").is_empty());

        let text_hits = report.by_rule("T002");
        assert_eq!(text_hits.len(), 1);
        assert_eq!(text_hits[0].location.file, Path::new("src/latin1.py"));
        assert_eq!(text_hits[0].location.line, 2);
    }

    #[test]
    fn test_project_rules_run_once() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/a.py", b"x = 1\n");
        write(tmp.path(), "src/b.py", b"y = 2\n");

        let report = engine(tmp.path(), Config::default()).run().unwrap();
        let hits = report.by_rule("T003");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].message, "2 files");
    }

    #[test]
    fn test_disabled_rules_are_skipped() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/a.py", b"def f\n# TODO\n");
        let mut config = Config::default();
        config.rules.insert(
            "text-rule".into(),
            RuleConfig {
                enabled: Some(false),
            },
        );

        let report = engine(tmp.path(), config).run().unwrap();
        assert!(report.by_rule("T002").is_empty());
        assert!(!report.rules.contains_key("T002"));
        assert_eq!(report.by_rule("T001").len(), 1);
    }

    #[test]
    fn test_runs_are_identical() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/z.py", b"def z\n# TODO\n");
        write(tmp.path(), "src/a/b.py", b"# TODO\ndef b\n");
        write(tmp.path(), "src/a.py", b"def a\n");

        let engine = engine(tmp.path(), Config::default());
        let first = engine.run().unwrap();
        let second = engine.run().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.render(), second.render());
    }

    #[test]
    fn test_relative_project_dir_is_resolved() {
        let engine = Engine::builder()
            .project_dir(".")
            .parser(StubParser)
            .build()
            .unwrap();
        assert!(engine.project_dir().is_absolute());
        assert_eq!(engine.rule_count(), 0);
    }
}
