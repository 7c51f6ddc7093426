//! Configuration types for guardrail.
//!
//! Every path in the configuration is relative to the project directory
//! handed to the engine. Defaults describe the conventional layout:
//!
//! ```toml
//! [analyzer]
//! root = "src"
//!
//! [access_point]
//! module = "src/db/client.py"
//! forbidden = ["psycopg2", "asyncpg", "sqlalchemy.engine", "sqlalchemy.create_engine"]
//!
//! [bounded_results]
//! allow = ["src/users/repository.py:get_by_id"]
//!
//! [registration]
//! handlers_dir = "src/endpoints"
//! registry_file = "src/routes.py"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Largest accepted window on either side of a multi-row query.
pub const MAX_WINDOW: usize = 50;

/// Top-level configuration for guardrail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// File discovery settings.
    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    /// Single data-access point settings.
    #[serde(default)]
    pub access_point: AccessPointConfig,

    /// Bounded result set settings.
    #[serde(default)]
    pub bounded_results: BoundedResultsConfig,

    /// Handler registration settings.
    #[serde(default)]
    pub registration: RegistrationConfig,

    /// Per-rule toggles, keyed by rule id.
    #[serde(default)]
    pub rules: BTreeMap<String, RuleConfig>,
}

impl Config {
    /// Creates a new default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails validation.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for name in &self.access_point.forbidden {
            if !is_dotted_name(name) {
                return Err(ConfigError::Validation(format!(
                    "access_point.forbidden: `{name}` is not a dotted module name"
                )));
            }
        }

        let br = &self.bounded_results;
        for method in br.multi_row.iter().chain(&br.bounded) {
            if !is_identifier(method) {
                return Err(ConfigError::Validation(format!(
                    "bounded_results: `{method}` is not a method name"
                )));
            }
        }
        if br.multi_row.is_empty() {
            return Err(ConfigError::Validation(
                "bounded_results.multi_row must not be empty".to_string(),
            ));
        }
        if br.lines_before > MAX_WINDOW || br.lines_after > MAX_WINDOW {
            return Err(ConfigError::Validation(format!(
                "bounded_results: window may not exceed {MAX_WINDOW} lines"
            )));
        }

        for pattern in &self.analyzer.exclude {
            glob::Pattern::new(pattern).map_err(|e| {
                ConfigError::Validation(format!("analyzer.exclude: `{pattern}`: {e}"))
            })?;
        }

        Ok(())
    }

    /// Checks if a rule is enabled.
    #[must_use]
    pub fn is_rule_enabled(&self, rule_name: &str) -> bool {
        self.rules
            .get(rule_name)
            .map_or(true, |c| c.enabled.unwrap_or(true))
    }
}

/// File discovery configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Directory to scan (default: `src`).
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Glob patterns, matched against project-relative paths, to exclude.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Directory names never descended into.
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            exclude: Vec::new(),
            exclude_dirs: default_exclude_dirs(),
        }
    }
}

/// Single data-access point configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPointConfig {
    /// The only module allowed to import the forbidden packages.
    #[serde(default = "default_access_module")]
    pub module: PathBuf,

    /// Dotted package names that only `module` may import.
    #[serde(default = "default_forbidden")]
    pub forbidden: Vec<String>,
}

impl Default for AccessPointConfig {
    fn default() -> Self {
        Self {
            module: default_access_module(),
            forbidden: default_forbidden(),
        }
    }
}

/// Bounded result set configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundedResultsConfig {
    /// Lines inspected before a multi-row query.
    #[serde(default = "default_lines_before")]
    pub lines_before: usize,

    /// Lines inspected after a multi-row query.
    #[serde(default = "default_lines_after")]
    pub lines_after: usize,

    /// Method names that fetch potentially many rows.
    #[serde(default = "default_multi_row")]
    pub multi_row: Vec<String>,

    /// Method names that bound a result set.
    #[serde(default = "default_bounded")]
    pub bounded: Vec<String>,

    /// Functions verified to be single-row lookups.
    #[serde(default)]
    pub allow: Vec<AllowEntry>,
}

impl Default for BoundedResultsConfig {
    fn default() -> Self {
        Self {
            lines_before: default_lines_before(),
            lines_after: default_lines_after(),
            multi_row: default_multi_row(),
            bounded: default_bounded(),
            allow: Vec::new(),
        }
    }
}

/// Handler registration configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationConfig {
    /// Directory whose modules must all be registered.
    #[serde(default = "default_handlers_dir")]
    pub handlers_dir: PathBuf,

    /// File that must mention every handler module.
    #[serde(default = "default_registry_file")]
    pub registry_file: PathBuf,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            handlers_dir: default_handlers_dir(),
            registry_file: default_registry_file(),
        }
    }
}

/// Per-rule configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Whether this rule is enabled.
    #[serde(default)]
    pub enabled: Option<bool>,
}

/// A `(file, function)` pair exempt from the bounded-results rule.
///
/// Written as `"path/to/file.py:function_name"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AllowEntry {
    /// Project-relative file path.
    pub file: PathBuf,
    /// Name of the enclosing function.
    pub function: String,
}

impl AllowEntry {
    /// Creates a new entry.
    #[must_use]
    pub fn new(file: impl Into<PathBuf>, function: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            function: function.into(),
        }
    }
}

impl FromStr for AllowEntry {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidAllowEntry {
            entry: s.to_string(),
        };
        let (file, function) = s.rsplit_once(':').ok_or_else(invalid)?;
        if file.trim().is_empty() || !is_identifier(function) {
            return Err(invalid());
        }
        Ok(Self::new(file.trim(), function))
    }
}

impl TryFrom<String> for AllowEntry {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AllowEntry> for String {
    fn from(entry: AllowEntry) -> Self {
        entry.to_string()
    }
}

impl fmt::Display for AllowEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.function)
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_alphabetic())
        && chars.all(|c| c == '_' || c.is_alphanumeric())
}

fn is_dotted_name(s: &str) -> bool {
    s.split('.').all(is_identifier)
}

fn default_root() -> PathBuf {
    PathBuf::from("src")
}

fn default_exclude_dirs() -> Vec<String> {
    [
        "__pycache__",
        ".venv",
        "venv",
        "node_modules",
        ".git",
        ".tox",
        ".mypy_cache",
        ".pytest_cache",
        "build",
        "dist",
        "site-packages",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

fn default_access_module() -> PathBuf {
    PathBuf::from("src/db/client.py")
}

fn default_forbidden() -> Vec<String> {
    [
        "psycopg2",
        "asyncpg",
        "sqlalchemy.engine",
        "sqlalchemy.create_engine",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

fn default_lines_before() -> usize {
    2
}

fn default_lines_after() -> usize {
    5
}

fn default_multi_row() -> Vec<String> {
    ["all", "filter", "filter_by", "select", "query"]
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

fn default_bounded() -> Vec<String> {
    ["limit", "paginate", "slice", "first"]
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

fn default_handlers_dir() -> PathBuf {
    PathBuf::from("src/endpoints")
}

fn default_registry_file() -> PathBuf {
    PathBuf::from("src/routes.py")
}

/// Configuration errors.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("Failed to read config file {path}: {source}")]
    #[diagnostic(code(guardrail::config::io))]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Parse error in config file.
    #[error("Failed to parse config: {message}")]
    #[diagnostic(
        code(guardrail::config::parse),
        help("check the TOML syntax and section names of guardrail.toml")
    )]
    Parse {
        /// Parse error message.
        message: String,
    },

    /// Malformed allowlist entry.
    #[error("Invalid allow entry `{entry}`")]
    #[diagnostic(
        code(guardrail::config::allow_entry),
        help("allow entries are written as \"path/to/file.py:function_name\"")
    )]
    InvalidAllowEntry {
        /// The offending entry.
        entry: String,
    },

    /// Structurally valid TOML with invalid values.
    #[error("Invalid config: {0}")]
    #[diagnostic(code(guardrail::config::validation))]
    Validation(String),
}
