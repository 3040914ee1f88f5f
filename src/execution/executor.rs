//! Step executor - runs individual steps through the build tool

use crate::{
    core::{properties, RunContext, RunId, Step},
    execution::{EventHandlers, ExecutionEvent, Interrupt},
    secrets::SecretRegistry,
    tool::{BuildTool, OutputSink, ToolError, ToolInvocation},
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Property key carrying the step id
pub const STEP_ID_PROPERTY: &str = "step.id";

/// Property key carrying the absolute workspace path
pub const WORKSPACE_DIR_PROPERTY: &str = "ws.dir";

/// Header comment of generated property files
const PROPERTY_FILE_HEADER: &str = "step properties";

/// Why a step failed
#[derive(Debug, Error)]
pub enum StepError {
    #[error("failed to prepare property file {path}: {source}")]
    PropertyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Tool(#[from] ToolError),
}

/// Result of executing a step
#[derive(Debug)]
pub enum StepOutcome {
    /// Tool exited cleanly
    Succeeded,
    /// Property file or tool failure
    Failed(StepError),
    /// Interruption raised before or during the step
    Interrupted,
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Succeeded)
    }
}

/// Redacts tool output, then logs it and forwards it as events
struct RedactingSink<'a> {
    run_id: RunId,
    step_id: &'a str,
    registry: &'a SecretRegistry,
    events: &'a EventHandlers,
}

impl OutputSink for RedactingSink<'_> {
    fn line(&self, line: &str) {
        let line = self.registry.redact(self.run_id, line);
        info!(step = self.step_id, "{}", line);
        self.events.emit(ExecutionEvent::StepOutput {
            step_id: self.step_id.to_string(),
            line,
        });
    }
}

/// Removes a property file holding secret literals when dropped
///
/// Covers every way out of a step, including a failed write and the step
/// future being dropped by an outer timeout.
struct PropertyFileGuard {
    path: PathBuf,
    holds_secret: bool,
}

impl PropertyFileGuard {
    fn new(path: PathBuf, holds_secret: bool) -> Self {
        Self { path, holds_secret }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PropertyFileGuard {
    fn drop(&mut self) {
        if !self.holds_secret {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                warn!("Failed to remove property file {}: {}", self.path.display(), e);
            }
            _ => debug!("Removed property file {}", self.path.display()),
        }
    }
}

/// Executes a single step
pub struct StepExecutor<T> {
    tool: T,
}

impl<T: BuildTool> StepExecutor<T> {
    pub fn new(tool: T) -> Self {
        Self { tool }
    }

    pub fn tool(&self) -> &T {
        &self.tool
    }

    /// Property set handed to the build tool for `step`
    ///
    /// Step properties with `${VAR}` expanded, then `step.id` and `ws.dir`,
    /// then every entry of the run properties file as an override.
    pub async fn build_properties(
        &self,
        step: &Step,
        run: &RunContext,
    ) -> std::io::Result<BTreeMap<String, String>> {
        let mut props = step.resolve_properties(&run.environment);
        props.insert(STEP_ID_PROPERTY.to_string(), step.id.clone());
        props.insert(
            WORKSPACE_DIR_PROPERTY.to_string(),
            run.workspace.root().to_string_lossy().into_owned(),
        );
        props.extend(run.workspace.load_run_properties().await?);
        Ok(props)
    }

    fn prepare_failed(step: &Step, path: PathBuf, source: std::io::Error) -> StepOutcome {
        let err = StepError::PropertyFile { path, source };
        error!(step = %step.id, "Step failed: {}", err);
        StepOutcome::Failed(err)
    }

    /// Execute a step and return the result
    ///
    /// Never returns an error; every failure is logged and reported in the
    /// outcome.
    pub async fn execute(
        &self,
        step: &Step,
        run: &RunContext,
        registry: &SecretRegistry,
        interrupt: &Interrupt,
        events: &EventHandlers,
    ) -> StepOutcome {
        if interrupt.is_triggered() {
            warn!(step = %step.id, "Interrupted before step started");
            return StepOutcome::Interrupted;
        }

        info!("Executing step: {}", step.id);

        let props = match self.build_properties(step, run).await {
            Ok(props) => props,
            Err(source) => {
                let path = run.workspace.run_properties_path();
                return Self::prepare_failed(step, path, source);
            }
        };

        let live = registry.secrets_for(run.run_id);
        let holds_secret = props
            .values()
            .any(|value| live.iter().any(|secret| value.contains(secret.as_str())));

        let file = PropertyFileGuard::new(run.workspace.step_property_file(&step.id), holds_secret);
        if let Err(source) = properties::store(file.path(), &props, Some(PROPERTY_FILE_HEADER)).await {
            return Self::prepare_failed(step, file.path().to_path_buf(), source);
        }
        debug!(step = %step.id, "Wrote property file {}", file.path().display());

        let sink = RedactingSink {
            run_id: run.run_id,
            step_id: &step.id,
            registry,
            events,
        };
        let invocation = ToolInvocation {
            run_id: run.run_id,
            step_id: &step.id,
            property_file: file.path(),
            workspace: &run.workspace,
            environment: &run.environment,
        };

        let result = tokio::select! {
            biased;
            _ = interrupt.triggered() => None,
            result = self.tool.run_step(invocation, &sink) => Some(result),
        };

        drop(file);

        match result {
            None => {
                warn!(step = %step.id, "Step interrupted");
                StepOutcome::Interrupted
            }
            Some(Ok(())) => {
                info!("Step {} completed successfully", step.id);
                StepOutcome::Succeeded
            }
            Some(Err(e)) => {
                let err = StepError::from(e);
                error!(step = %step.id, "Step failed: {}", err);
                StepOutcome::Failed(err)
            }
        }
    }
}
