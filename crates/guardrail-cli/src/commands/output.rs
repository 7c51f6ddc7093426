//! Shared output formatting for reports.

use anyhow::Result;
use guardrail_core::Report;
use std::fmt::Write;

use crate::OutputFormat;

/// Formats a report in the specified format.
pub fn format(report: &Report, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => report.render(),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(report)?;
            json.push('\n');
            json
        }
        OutputFormat::Compact => format_compact(report),
    })
}

fn format_compact(report: &Report) -> String {
    let mut out = String::new();
    for violation in &report.violations {
        let _ = writeln!(out, "{violation}");
    }
    out
}
