//! Rule requiring every handler module to be registered.
//!
//! # Rationale
//!
//! A handler module that is never mentioned in the registration file is
//! dead on arrival: it ships, but no route ever reaches it.
//!
//! # Detection
//!
//! Every module under the handlers directory (except `__init__`) must have
//! its base name appear somewhere in the registration file's text. A missing
//! handlers directory or registration file means the project does not follow
//! the convention, and the rule is skipped.

use guardrail_core::utils::to_slash;
use guardrail_core::{
    Location, ProjectContext, ProjectRule, RegistrationConfig, Suggestion, Violation,
};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Rule code for registration-consistency.
pub const CODE: &str = "GR003";

/// Rule name for registration-consistency.
pub const NAME: &str = "registration-consistency";

/// Checks that every handler module is referenced by the registry file.
#[derive(Debug, Clone)]
pub struct RegistrationConsistency {
    handlers_dir: PathBuf,
    registry_file: PathBuf,
}

impl Default for RegistrationConsistency {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistrationConsistency {
    /// Creates a new rule with the default layout.
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(&RegistrationConfig::default())
    }

    /// Creates the rule from configuration.
    #[must_use]
    pub fn from_config(config: &RegistrationConfig) -> Self {
        Self {
            handlers_dir: config.handlers_dir.clone(),
            registry_file: config.registry_file.clone(),
        }
    }
}

impl ProjectRule for RegistrationConsistency {
    fn name(&self) -> &'static str {
        NAME
    }

    fn code(&self) -> &'static str {
        CODE
    }

    fn description(&self) -> &'static str {
        "Every handler module must be registered"
    }

    fn remediation(&self) -> String {
        format!(
            "Import or register each handler module in {}. Unregistered handlers are unreachable.",
            to_slash(&self.registry_file)
        )
    }

    fn check_project(&self, ctx: &ProjectContext<'_>) -> Vec<Violation> {
        let handlers_dir = ctx.resolve(&self.handlers_dir);
        if !handlers_dir.is_dir() {
            debug!(
                "No handlers directory at {}, skipping {}",
                handlers_dir.display(),
                NAME
            );
            return Vec::new();
        }

        let registry_path = ctx.resolve(&self.registry_file);
        let registry = match std::fs::read(&registry_path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                warn!(
                    "Skipping {}: cannot read {}: {}",
                    NAME,
                    registry_path.display(),
                    e
                );
                return Vec::new();
            }
        };

        let handlers = match ctx.locator.collect(&handlers_dir) {
            Ok(files) => files,
            Err(e) => {
                warn!("Skipping {}: {}", NAME, e);
                return Vec::new();
            }
        };

        let registry_name = to_slash(&ctx.relative(&registry_path));
        let mut seen = BTreeSet::new();
        let mut violations = Vec::new();

        for handler in handlers {
            let Some(module) = handler.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if module == "__init__" || !seen.insert(module.to_owned()) {
                continue;
            }
            if registry.contains(module) {
                continue;
            }
            violations.push(
                Violation::new(
                    CODE,
                    NAME,
                    Location::new(ctx.relative(&handler), 1),
                    format!("Handler module '{module}' is not registered in {registry_name}"),
                )
                .with_suggestion(Suggestion::new(format!(
                    "import {module} in {registry_name}"
                ))),
            );
        }

        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guardrail_core::FileLocator;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn check(root: &Path) -> Vec<Violation> {
        let locator = FileLocator::new(&["py"]).exclude_dirs(["__pycache__"]);
        let ctx = ProjectContext::new(root, &locator);
        RegistrationConsistency::new().check_project(&ctx)
    }

    #[test]
    fn flags_unregistered_handler() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/endpoints/__init__.py", "");
        write(tmp.path(), "src/endpoints/orders.py", "");
        write(tmp.path(), "src/endpoints/users.py", "");
        write(tmp.path(), "src/routes.py", "from src.endpoints import users\n");

        let violations = check(tmp.path());
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].location,
            Location::new("src/endpoints/orders.py", 1)
        );
        assert_eq!(
            violations[0].message,
            "Handler module 'orders' is not registered in src/routes.py"
        );
    }

    #[test]
    fn registering_fixes_the_violation() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/endpoints/orders.py", "");
        write(tmp.path(), "src/routes.py", "");
        assert_eq!(check(tmp.path()).len(), 1);

        write(tmp.path(), "src/routes.py", "from src.endpoints import orders\n");
        assert!(check(tmp.path()).is_empty());
    }

    #[test]
    fn duplicate_names_report_first_sorted_path() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/endpoints/v2/orders.py", "");
        write(tmp.path(), "src/endpoints/orders.py", "");
        write(tmp.path(), "src/routes.py", "");

        let violations = check(tmp.path());
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].location.file,
            PathBuf::from("src/endpoints/orders.py")
        );
    }

    #[test]
    fn missing_convention_is_skipped() {
        let tmp = TempDir::new().unwrap();
        assert!(check(tmp.path()).is_empty());

        write(tmp.path(), "src/endpoints/orders.py", "");
        assert!(check(tmp.path()).is_empty());
    }

    #[test]
    fn empty_handler_set_passes() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("src/endpoints/__pycache__")).unwrap();
        write(tmp.path(), "src/endpoints/__init__.py", "");
        write(tmp.path(), "src/routes.py", "");
        assert!(check(tmp.path()).is_empty());
    }
}
