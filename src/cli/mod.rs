//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{HistoryCommand, RunCommand, StepsCommand, ValidateCommand};

/// EDA flow orchestration tool
#[derive(Debug, Parser, Clone)]
#[command(name = "edaflow")]
#[command(version = "0.1.0")]
#[command(about = "Drive vendor P&R, synthesis, power, and simulation tools with checkpointed step pipelines", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run a tool flow
    Run(RunCommand),

    /// Validate a flow configuration
    Validate(ValidateCommand),

    /// List a tool's steps (the valid resume targets)
    Steps(StepsCommand),

    /// Show run history
    History(HistoryCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}

use std::ffi::OsString;
