//! Finding and loading `guardrail.toml`.
//!
//! The first hit wins: the `--config` path, `guardrail.toml` or
//! `.guardrail.toml` in the project directory, then `config.toml` in the user
//! directory (`$GUARDRAIL_CONFIG_DIR`, else `~/.guardrail`). With no file at
//! all the built-in defaults apply.

use guardrail_core::{Config, ConfigError};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const PROJECT_FILES: [&str; 2] = ["guardrail.toml", ".guardrail.toml"];
const USER_FILE: &str = "config.toml";

/// Where a loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Named on the command line. Its existence is never checked up front.
    Flag(PathBuf),
    /// Lives in the scanned project.
    Project(PathBuf),
    /// Per-user fallback shared by every project.
    User(PathBuf),
    /// No file; built-in defaults.
    BuiltIn,
}

impl Origin {
    /// File backing this configuration, if any.
    #[must_use]
    pub fn file(&self) -> Option<&Path> {
        match self {
            Self::Flag(p) | Self::Project(p) | Self::User(p) => Some(p),
            Self::BuiltIn => None,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(p) => write!(f, "{} (--config)", p.display()),
            Self::Project(p) => write!(f, "{}", p.display()),
            Self::User(p) => write!(f, "{} (user)", p.display()),
            Self::BuiltIn => f.write_str("built-in defaults"),
        }
    }
}

/// A validated configuration and the file it was read from.
#[derive(Debug)]
pub struct LoadedConfig {
    /// The configuration itself.
    pub config: Config,
    /// Provenance, shown by `list-rules`.
    pub origin: Origin,
}

/// Finds and loads the configuration for `project_dir`.
///
/// # Errors
///
/// Returns an error if the chosen file cannot be read, parsed or validated.
/// A missing `--config` file is an error; a missing project or user file
/// only moves the lookup on.
pub fn load(project_dir: &Path, flag: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    load_from(project_dir, flag, user_dir().as_deref())
}

/// [`load`] with the user directory passed in, keeping tests off the
/// process environment.
fn load_from(
    project_dir: &Path,
    flag: Option<&Path>,
    user_dir: Option<&Path>,
) -> Result<LoadedConfig, ConfigError> {
    let origin = locate(project_dir, flag, user_dir);

    let config = match origin.file() {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    match &origin {
        Origin::User(_) => info!("Using config from {origin}"),
        _ => debug!("Using config from {origin}"),
    }

    Ok(LoadedConfig { config, origin })
}

fn locate(project_dir: &Path, flag: Option<&Path>, user_dir: Option<&Path>) -> Origin {
    if let Some(path) = flag {
        return Origin::Flag(path.to_path_buf());
    }

    PROJECT_FILES
        .iter()
        .map(|name| project_dir.join(name))
        .find(|path| path.is_file())
        .map(Origin::Project)
        .or_else(|| {
            user_dir
                .map(|dir| dir.join(USER_FILE))
                .filter(|path| path.is_file())
                .map(Origin::User)
        })
        .unwrap_or(Origin::BuiltIn)
}

/// `$GUARDRAIL_CONFIG_DIR`, else `~/.guardrail`.
fn user_dir() -> Option<PathBuf> {
    std::env::var_os("GUARDRAIL_CONFIG_DIR")
        .map(PathBuf::from)
        .or_else(|| home::home_dir().map(|h| h.join(".guardrail")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const ALT_REGISTRY: &str = "[registration]\nregistry_file = \"src/app.py\"\n";

    #[test]
    fn project_file_is_loaded() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("guardrail.toml"), ALT_REGISTRY).unwrap();

        let loaded = load_from(project.path(), None, None).unwrap();
        assert_eq!(
            loaded.origin,
            Origin::Project(project.path().join("guardrail.toml"))
        );
        assert_eq!(
            loaded.config.registration.registry_file,
            PathBuf::from("src/app.py")
        );
    }

    #[test]
    fn hidden_project_file_is_second_choice() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join(".guardrail.toml"), ALT_REGISTRY).unwrap();
        let loaded = load_from(project.path(), None, None).unwrap();
        assert_eq!(
            loaded.origin,
            Origin::Project(project.path().join(".guardrail.toml"))
        );

        fs::write(project.path().join("guardrail.toml"), "").unwrap();
        let loaded = load_from(project.path(), None, None).unwrap();
        assert_eq!(
            loaded.origin,
            Origin::Project(project.path().join("guardrail.toml"))
        );
        assert_eq!(loaded.config, Config::default());
    }

    #[test]
    fn flag_overrides_project_file() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("guardrail.toml"), "").unwrap();
        let custom = project.path().join("ci.toml");
        fs::write(&custom, ALT_REGISTRY).unwrap();

        let loaded = load_from(project.path(), Some(&custom), None).unwrap();
        assert_eq!(loaded.origin, Origin::Flag(custom));
        assert_eq!(
            loaded.config.registration.registry_file,
            PathBuf::from("src/app.py")
        );
    }

    #[test]
    fn missing_flag_file_is_an_error() {
        let project = TempDir::new().unwrap();
        let err = load_from(project.path(), Some(&project.path().join("nope.toml")), None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn user_file_used_only_without_project_file() {
        let project = TempDir::new().unwrap();
        let user = TempDir::new().unwrap();
        fs::write(user.path().join("config.toml"), ALT_REGISTRY).unwrap();

        let loaded = load_from(project.path(), None, Some(user.path())).unwrap();
        assert_eq!(loaded.origin, Origin::User(user.path().join("config.toml")));
        assert_eq!(
            loaded.config.registration.registry_file,
            PathBuf::from("src/app.py")
        );

        fs::write(project.path().join("guardrail.toml"), "").unwrap();
        let loaded = load_from(project.path(), None, Some(user.path())).unwrap();
        assert!(matches!(loaded.origin, Origin::Project(_)));
    }

    #[test]
    fn directory_named_like_config_is_ignored() {
        let project = TempDir::new().unwrap();
        fs::create_dir(project.path().join("guardrail.toml")).unwrap();

        let loaded = load_from(project.path(), None, None).unwrap();
        assert_eq!(loaded.origin, Origin::BuiltIn);
        assert_eq!(loaded.config, Config::default());
    }

    #[test]
    fn invalid_project_file_is_an_error() {
        let project = TempDir::new().unwrap();
        fs::write(
            project.path().join("guardrail.toml"),
            "[bounded_results]\nallow = [\"no-colon\"]\n",
        )
        .unwrap();
        assert!(load_from(project.path(), None, None).is_err());
    }

    #[test]
    fn origin_display_names_the_source() {
        assert_eq!(Origin::BuiltIn.to_string(), "built-in defaults");
        assert_eq!(
            Origin::Flag(PathBuf::from("ci.toml")).to_string(),
            "ci.toml (--config)"
        );
        assert_eq!(
            Origin::User(PathBuf::from("/home/me/.guardrail/config.toml")).to_string(),
            "/home/me/.guardrail/config.toml (user)"
        );
        assert!(Origin::BuiltIn.file().is_none());
    }
}
