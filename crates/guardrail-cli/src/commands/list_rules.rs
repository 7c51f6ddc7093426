//! List rules command implementation.

use anyhow::{Context, Result};
use guardrail_rules::Catalog;

use crate::config_file::LoadedConfig;

/// Runs the list-rules command.
pub fn run(loaded: &LoadedConfig) -> Result<()> {
    let config = &loaded.config;
    let catalog = Catalog::from_config(config).context("Failed to build rules")?;

    println!("Configuration: {}\n", loaded.origin);
    println!("Available rules:\n");
    println!("{:<8} {:<26} {:<8} Description", "Code", "Name", "Signal");
    println!("{}", "-".repeat(80));

    for entry in catalog.entries() {
        let enabled = if config.is_rule_enabled(entry.name) {
            ""
        } else {
            " (disabled)"
        };
        println!(
            "{:<8} {:<26} {:<8} {}{}",
            entry.code,
            entry.name,
            entry.kind.as_str(),
            entry.description,
            enabled
        );
    }

    println!("\nUse --rules to run specific rules, e.g.:");
    println!("  guardrail check --rules single-access-point,bounded-results");
    println!("  guardrail check --rules GR001,GR003");

    Ok(())
}
