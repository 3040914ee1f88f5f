//! External build tool boundary
//!
//! One process invocation per step, parameterized only by the generated
//! property file. The exit status is the sole success signal.

pub mod config;
pub mod provision;
pub mod subprocess;

use crate::core::{RunId, Workspace};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

pub use config::ToolConfig;
pub use provision::provision_tool;
pub use subprocess::CommandTool;

/// Error types for build tool invocations
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("build tool exited with code {0}")]
    Exit(i32),

    #[error("build tool was terminated by a signal")]
    Signal,

    #[error("build tool I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything the build tool gets for one step
#[derive(Debug, Clone, Copy)]
pub struct ToolInvocation<'a> {
    pub run_id: RunId,
    pub step_id: &'a str,
    pub property_file: &'a Path,
    pub workspace: &'a Workspace,
    pub environment: &'a HashMap<String, String>,
}

/// Receives tool output one line at a time
pub trait OutputSink: Send + Sync {
    fn line(&self, line: &str);
}

/// Trait for build tool execution - allows for different implementations
#[async_trait]
pub trait BuildTool: Send + Sync {
    /// Run one step to completion
    async fn run_step(
        &self,
        invocation: ToolInvocation<'_>,
        output: &dyn OutputSink,
    ) -> Result<(), ToolError>;
}
