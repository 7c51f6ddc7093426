//! Init command implementation.

use anyhow::{bail, Context, Result};
use std::path::Path;

const DEFAULT_CONFIG: &str = r#"# guardrail configuration
# Paths are relative to the project directory.

[analyzer]
# Directory to scan
root = "src"

# Glob patterns to exclude from analysis
exclude = [
    "**/migrations/**",
]

[access_point]
# The only module allowed to import database drivers
module = "src/db/client.py"
forbidden = ["psycopg2", "asyncpg", "sqlalchemy.engine", "sqlalchemy.create_engine"]

[bounded_results]
# Lines searched for .limit()/.paginate()/slicing around a multi-row query
lines_before = 2
lines_after = 5

# Functions verified to return a single row, as "file.py:function"
allow = [
    # "src/users/repository.py:get_by_id",
]

[registration]
handlers_dir = "src/endpoints"
registry_file = "src/routes.py"

# Rules can be disabled individually
# [rules.registration-consistency]
# enabled = false
"#;

/// Config file name written by `init`.
pub const CONFIG_FILE: &str = "guardrail.toml";

/// Runs the init command, writing `guardrail.toml` into `dir`.
pub fn run(dir: &Path, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILE);

    if config_path.exists() && !force {
        bail!(
            "Configuration file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(&config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    println!("Created {}", config_path.display());
    println!("\nNext steps:");
    println!("  1. Edit {CONFIG_FILE} to match your project layout");
    println!("  2. Run: guardrail check");

    Ok(())
}
