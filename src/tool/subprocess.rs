//! Build tool subprocess client

use crate::tool::{BuildTool, OutputSink, ToolConfig, ToolError, ToolInvocation};
use async_trait::async_trait;
use std::io;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs the configured build tool as a child process
#[derive(Debug, Clone)]
pub struct CommandTool {
    config: ToolConfig,
}

impl CommandTool {
    pub fn new(config: ToolConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ToolConfig {
        &self.config
    }
}

async fn pump<R: AsyncRead + Unpin>(reader: Option<R>, output: &dyn OutputSink) {
    let Some(reader) = reader else {
        return;
    };
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => output.line(&line),
            Ok(None) => break,
            Err(e) => {
                warn!("Stopped reading build tool output: {}", e);
                break;
            }
        }
    }
}

#[async_trait]
impl BuildTool for CommandTool {
    /// Spawn the tool, stream its stdout and stderr, wait for exit
    ///
    /// The child is killed if this future is dropped.
    async fn run_step(
        &self,
        invocation: ToolInvocation<'_>,
        output: &dyn OutputSink,
    ) -> Result<(), ToolError> {
        let argv = self
            .config
            .command_line(invocation.workspace, invocation.property_file);
        let (program, args) = match argv.split_first() {
            Some((program, args)) if !program.is_empty() => (program, args),
            _ => {
                return Err(ToolError::Spawn {
                    program: String::new(),
                    source: io::Error::new(io::ErrorKind::InvalidInput, "no build tool program configured"),
                })
            }
        };

        debug!(step = invocation.step_id, "Spawning build tool: {}", argv.join(" "));

        let mut child = Command::new(program)
            .args(args)
            .current_dir(invocation.workspace.root())
            .envs(invocation.environment)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ToolError::Spawn {
                program: program.clone(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (status, _, _) = tokio::join!(child.wait(), pump(stdout, output), pump(stderr, output));
        let status = status?;

        if status.success() {
            return Ok(());
        }

        match status.code() {
            Some(code) => {
                warn!(step = invocation.step_id, "Build tool exited with code {}", code);
                Err(ToolError::Exit(code))
            }
            None => Err(ToolError::Signal),
        }
    }
}
