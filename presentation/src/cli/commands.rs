//! CLI command definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use conductor_domain::{ComplexityLevel, TaskType};
use std::path::PathBuf;

/// Output format for plans and run results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON output
    Json,
}

impl From<OutputFormat> for conductor_domain::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => conductor_domain::OutputFormat::Text,
            OutputFormat::Json => conductor_domain::OutputFormat::Json,
        }
    }
}

/// CLI arguments for agent-conductor
#[derive(Parser, Debug)]
#[command(name = "conductor")]
#[command(author, version, about = "Coordinate specialized tool agents behind a single request")]
#[command(long_about = r#"
Conductor decomposes a request into a plan of dependent steps and dispatches
each step to a capability-specific tool agent.

  plan   Classify the request and print the resulting plan
  run    Execute the plan against the built-in dry-run agents

Configuration files are loaded from (in priority order):
1. CONDUCTOR_* environment variables (nested keys joined with "__")
2. --config <path>          Explicit config file
3. ./conductor.toml         Project-level config
4. ~/.config/agent-conductor/config.toml   Global config

Example:
  conductor plan "Fix the crash in the parser"
  conductor run --complexity complex "Review the security of the auth module"
  conductor run --static -o json "Document the public API"
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Output format (overrides [output] format from the config file)
    #[arg(short, long, value_enum, global = true)]
    pub output: Option<OutputFormat>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Show configuration sources and the effective configuration, then exit
    #[arg(long)]
    pub show_config: bool,

    /// Record every bus message to this JSONL file
    #[arg(long, value_name = "PATH", global = true)]
    pub journal: Option<PathBuf>,

    /// Also write logs to daily-rotated files in this directory
    #[arg(long, value_name = "DIR", global = true)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the plan for a request without executing it
    Plan(RequestArgs),
    /// Plan and execute a request against the dry-run agents
    Run(RequestArgs),
    /// List the registered dry-run agents
    Agents,
}

/// Arguments shared by `plan` and `run`
#[derive(Args, Debug, Clone)]
pub struct RequestArgs {
    /// The request to plan
    pub request: String,

    /// Complexity of the request: simple, moderate or complex
    #[arg(long, default_value = "moderate", value_name = "LEVEL")]
    pub complexity: ComplexityLevel,

    /// Task type to assume when the request text is ambiguous
    #[arg(long, value_name = "TYPE")]
    pub task_type: Option<TaskType>,

    /// Use the static planner (no adaptive follow-up steps)
    #[arg(long = "static")]
    pub static_plan: bool,

    /// Project root passed to every step
    #[arg(long, value_name = "DIR")]
    pub project_root: Option<PathBuf>,
}
