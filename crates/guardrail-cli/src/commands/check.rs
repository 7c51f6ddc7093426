//! Check command implementation.

use anyhow::{Context, Result};
use guardrail_core::Config;
use guardrail_rules::Catalog;
use std::path::Path;

use crate::OutputFormat;

/// Runs the check command.
///
/// Returns `true` when the project has no violations.
pub fn run(
    path: &Path,
    format: OutputFormat,
    rules_filter: Option<&str>,
    config: &Config,
) -> Result<bool> {
    let mut catalog = Catalog::from_config(config).context("Failed to build rules")?;
    if let Some(filter) = rules_filter {
        let ids: Vec<&str> = filter
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        catalog = catalog.select(&ids).context("Invalid --rules filter")?;
    }

    tracing::info!("Checking {} with {} rules", path.display(), catalog.len());

    let report = catalog.run(path, config).context("Scan failed")?;

    print!("{}", super::output::format(&report, format)?);

    Ok(report.is_success())
}
