//! The built-in rule catalog.

use crate::{BoundedResults, RegistrationConsistency, SingleAccessPoint};
use guardrail_core::{
    Config, ConfigError, Engine, EngineBuilder, EngineError, ProjectRuleBox, Report, RuleBox,
    Signal,
};
use guardrail_python::PythonParser;
use std::path::Path;

/// How a catalog entry inspects the project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Per-file rule on the structural tree.
    Tree,
    /// Per-file rule on raw text.
    Text,
    /// Project-wide rule.
    Project,
}

impl RuleKind {
    /// Short lowercase label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tree => "tree",
            Self::Text => "text",
            Self::Project => "project",
        }
    }
}

/// Description of one rule in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Rule code.
    pub code: &'static str,
    /// Stable rule id.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// Fix instruction.
    pub remediation: String,
    /// Input the rule inspects.
    pub kind: RuleKind,
}

/// Ordered set of configured rule instances.
pub struct Catalog {
    rules: Vec<RuleBox>,
    project_rules: Vec<ProjectRuleBox>,
}

impl Catalog {
    /// Builds every built-in rule from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a rule's configuration is invalid.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            rules: vec![
                Box::new(SingleAccessPoint::from_config(&config.access_point)),
                Box::new(BoundedResults::from_config(&config.bounded_results)?),
            ],
            project_rules: vec![Box::new(RegistrationConsistency::from_config(
                &config.registration,
            ))],
        })
    }

    /// Keeps only the rules named by id or code.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for an unknown id.
    pub fn select<S: AsRef<str>>(mut self, ids: &[S]) -> Result<Self, ConfigError> {
        let known: Vec<(&str, &str)> = self
            .entries()
            .iter()
            .map(|e| (e.name, e.code))
            .collect();
        for id in ids {
            let id = id.as_ref();
            if !known.iter().any(|(name, code)| *name == id || *code == id) {
                return Err(ConfigError::Validation(format!("unknown rule `{id}`")));
            }
        }

        let wanted = |name: &str, code: &str| {
            ids.iter()
                .any(|id| id.as_ref() == name || id.as_ref() == code)
        };
        self.rules.retain(|r| wanted(r.name(), r.code()));
        self.project_rules.retain(|r| wanted(r.name(), r.code()));
        Ok(self)
    }

    /// Describes the rules, in catalog order.
    #[must_use]
    pub fn entries(&self) -> Vec<CatalogEntry> {
        let per_file = self.rules.iter().map(|r| CatalogEntry {
            code: r.code(),
            name: r.name(),
            description: r.description(),
            remediation: r.remediation(),
            kind: match r.signal() {
                Signal::Tree => RuleKind::Tree,
                Signal::Text => RuleKind::Text,
            },
        });
        let project = self.project_rules.iter().map(|r| CatalogEntry {
            code: r.code(),
            name: r.name(),
            description: r.description(),
            remediation: r.remediation(),
            kind: RuleKind::Project,
        });
        per_file.chain(project).collect()
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len() + self.project_rules.len()
    }

    /// Returns true if no rule is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds every rule to an engine builder.
    #[must_use]
    pub fn install(self, builder: EngineBuilder) -> EngineBuilder {
        let builder = self
            .rules
            .into_iter()
            .fold(builder, EngineBuilder::rule_box);
        self.project_rules
            .into_iter()
            .fold(builder, EngineBuilder::project_rule_box)
    }

    /// Scans a Python project with these rules.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the scan root
    /// cannot be walked.
    pub fn run(self, project_dir: &Path, config: &Config) -> Result<Report, EngineError> {
        let builder = Engine::builder()
            .project_dir(project_dir)
            .config(config.clone())
            .parser(PythonParser::new());
        self.install(builder).build()?.run()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_order_and_codes() {
        let catalog = Catalog::from_config(&Config::default()).unwrap();
        let entries = catalog.entries();
        let ids: Vec<_> = entries.iter().map(|e| (e.code, e.name, e.kind)).collect();
        assert_eq!(
            ids,
            vec![
                ("GR001", "single-access-point", RuleKind::Tree),
                ("GR002", "bounded-results", RuleKind::Text),
                ("GR003", "registration-consistency", RuleKind::Project),
            ]
        );
        assert!(entries.iter().all(|e| !e.remediation.is_empty()));
    }

    #[test]
    fn select_by_name_or_code() {
        let catalog = Catalog::from_config(&Config::default())
            .unwrap()
            .select(&["GR003", "bounded-results"])
            .unwrap();
        let names: Vec<_> = catalog.entries().iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["bounded-results", "registration-consistency"]);
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn select_rejects_unknown_rules() {
        let result = Catalog::from_config(&Config::default())
            .unwrap()
            .select(&["no-such-rule"]);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn remediation_mentions_configured_paths() {
        let mut config = Config::default();
        config.access_point.module = "app/db.py".into();
        let catalog = Catalog::from_config(&config).unwrap();
        assert!(catalog.entries()[0].remediation.contains("app/db.py"));
    }
}
