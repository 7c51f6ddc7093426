//! guardrail CLI tool.
//!
//! Usage:
//! ```bash
//! guardrail check [OPTIONS] [PATH]
//! guardrail list-rules
//! guardrail init [PATH]
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use guardrail_core::{ConfigError, EngineError};
use miette::{Diagnostic, GraphicalReportHandler};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod config_file;

/// Architecture checker for Python services
#[derive(Parser)]
#[command(name = "guardrail")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "GUARDRAIL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a project against the architecture rules
    Check {
        /// Project directory (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Only run specific rules (comma-separated ids or codes)
        #[arg(long)]
        rules: Option<String>,
    },

    /// List available rules
    ListRules,

    /// Initialize configuration file
    Init {
        /// Directory to write guardrail.toml into
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

/// Output format for reports.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text grouped by rule.
    #[default]
    Text,
    /// JSON output.
    Json,
    /// One-line-per-violation compact format.
    Compact,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            match render_diagnostic(&err) {
                Some(diagnostic) => eprintln!("{err}\n\n{diagnostic}"),
                None => eprintln!("error: {err:#}"),
            }
            ExitCode::from(2)
        }
    }
}

/// Runs the selected command; `Ok(false)` means violations were found.
fn run(cli: Cli) -> Result<bool> {
    match cli.command {
        Commands::Check {
            path,
            format,
            rules,
        } => {
            let loaded = config_file::load(&path, cli.config.as_deref())
                .context("Failed to load config")?;
            commands::check::run(&path, format, rules.as_deref(), &loaded.config)
        }
        Commands::ListRules => {
            let loaded = config_file::load(Path::new("."), cli.config.as_deref())
                .context("Failed to load config")?;
            commands::list_rules::run(&loaded)?;
            Ok(true)
        }
        Commands::Init { path, force } => {
            commands::init::run(&path, force)?;
            Ok(true)
        }
    }
}

/// Renders library errors carrying diagnostic codes and help text.
fn render_diagnostic(err: &anyhow::Error) -> Option<String> {
    let diagnostic: &dyn Diagnostic = if let Some(e) = err.downcast_ref::<EngineError>() {
        e
    } else if let Some(e) = err.downcast_ref::<ConfigError>() {
        e
    } else {
        return None;
    };

    let mut out = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut out, diagnostic)
        .ok()?;
    Some(out)
}
