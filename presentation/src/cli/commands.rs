//! CLI command definitions.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for a pipeline run.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Full formatted output with every stage the run reached.
    Full,
    /// Only the final status line.
    Synthesis,
    /// JSON output.
    Json,
}

/// CLI arguments for the exception-processing platform demo harness.
#[derive(Parser, Debug)]
#[command(name = "exception-platform")]
#[command(author, version, about = "Runs one exception through the triage/policy/resolution/supervisor/feedback pipeline")]
#[command(long_about = r#"
Drives a single exception record through the exception-processing pipeline:
Triage classifies it, Policy decides whether it may run unattended,
Resolution plans the playbook, Supervisor checkpoints the decision at three
points, and Feedback records the outcome if one is supplied.

Example:
  exception-platform --scenario scenario.json
  exception-platform --scenario scenario.json --output json
"#)]
pub struct Cli {
    /// Path to a JSON scenario file describing the exception, domain pack,
    /// and tenant policy to run. See `demos/` for examples.
    #[arg(long, value_name = "FILE")]
    pub scenario: PathBuf,

    /// Path to the application config file (overrides the default layering).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Path to the LLM routing config file.
    #[arg(long, value_name = "FILE")]
    pub routing_config: Option<PathBuf>,

    /// Run tools for real instead of the dry-run default.
    #[arg(long)]
    pub no_dry_run: bool,

    /// Output format.
    #[arg(short, long, value_enum, default_value = "full")]
    pub output: OutputFormat,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress stage progress lines.
    #[arg(short, long)]
    pub quiet: bool,
}
