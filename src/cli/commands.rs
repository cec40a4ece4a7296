//! CLI command definitions

use crate::tools::ToolKind;
use clap::Args;
use std::path::PathBuf;

/// Run a tool flow
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to flow configuration YAML file
    #[arg(short, long)]
    pub file: String,

    /// Tool family to drive (defaults to the config's `tool` field)
    #[arg(short, long, value_enum)]
    pub tool: Option<ToolArg>,

    /// Step to resume from (restores the step's checkpoint first)
    #[arg(long)]
    pub from_step: Option<String>,

    /// Override the configured run directory
    #[arg(long)]
    pub rundir: Option<PathBuf>,

    /// Setting overrides (dotted.key=value)
    #[arg(long = "set", value_parser = parse_key_value)]
    pub set: Vec<(String, String)>,

    /// Don't save the run to history
    #[arg(long)]
    pub no_history: bool,

    /// Write the tool script but do not execute the tool (synthesis only)
    #[arg(long)]
    pub generate_only: bool,
}

/// Validate a flow configuration
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to flow configuration YAML file
    #[arg(short, long)]
    pub file: String,

    /// Check the required settings for this tool family
    /// (defaults to the config's `tool` field)
    #[arg(short, long, value_enum)]
    pub tool: Option<ToolArg>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// List a tool's step names (the valid --from-step targets)
#[derive(Debug, Args, Clone)]
pub struct StepsCommand {
    /// Tool family
    #[arg(short, long, value_enum)]
    pub tool: ToolArg,
}

/// Show run history
#[derive(Debug, Args, Clone)]
pub struct HistoryCommand {
    /// Flow name to filter by
    #[arg(short = 'f', long)]
    pub flow: Option<String>,

    /// Number of recent runs to show
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,

    /// Show full details
    #[arg(long)]
    pub verbose: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Show a specific run by ID
    #[arg(long)]
    pub run_id: Option<String>,
}

/// Tool family argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ToolArg {
    Par,
    #[clap(alias = "syn")]
    Synthesis,
    Power,
    Sim,
}

impl From<ToolArg> for ToolKind {
    fn from(arg: ToolArg) -> Self {
        match arg {
            ToolArg::Par => ToolKind::Par,
            ToolArg::Synthesis => ToolKind::Synthesis,
            ToolArg::Power => ToolKind::Power,
            ToolArg::Sim => ToolKind::Sim,
        }
    }
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = s.splitn(2, '=').collect();
    if parts.len() != 2 {
        return Err(format!("Invalid key=value pair: {}", s));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}
