//! CLI command definitions

use clap::Args;
use std::path::PathBuf;

/// Run a pipeline
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: PathBuf,

    /// Workspace directory (defaults to the current directory)
    #[arg(short, long)]
    pub workspace: Option<PathBuf>,

    /// Comma-separated stages to run, in order (default: run.properties, else all)
    #[arg(short, long, env = "STAGELINE_STAGES")]
    pub stages: Option<String>,

    /// YAML secret store file
    #[arg(long, env = "STAGELINE_SECRETS")]
    pub secrets: Option<PathBuf>,

    /// Build tool executable
    #[arg(long)]
    pub tool: Option<String>,

    /// Build tool distribution to provision into the workspace
    #[arg(long)]
    pub tool_home: Option<PathBuf>,

    /// Environment overrides (key=value)
    #[arg(short, long, value_parser = parse_key_value)]
    pub env: Vec<(String, String)>,
}

/// Validate a pipeline configuration
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// List the stages of a pipeline
#[derive(Debug, Args, Clone)]
pub struct StagesCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: PathBuf,
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("Invalid key=value pair: {}", s)),
    }
}
