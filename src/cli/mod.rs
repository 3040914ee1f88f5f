//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{RunCommand, StagesCommand, ValidateCommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// Multi-stage build pipelines with scoped secrets
#[derive(Debug, Parser, Clone)]
#[command(name = "stageline")]
#[command(author = "Stageline Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Runs declarative multi-stage build pipelines with scoped secret bindings", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to runner configuration file
    #[arg(short, long, global = true, env = "STAGELINE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run a pipeline
    Run(RunCommand),

    /// Validate a pipeline configuration
    Validate(ValidateCommand),

    /// List the stages of a pipeline in config order
    Stages(StagesCommand),
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
