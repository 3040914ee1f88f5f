//! Main execution engine - orchestrates the entire pipeline run

use crate::{
    core::{Pipeline, PipelineError, RunContext, StageSelection, Workspace},
    execution::{EventHandlers, ExecutionEvent, Interrupt, StageExecutor},
    secrets::{Binders, SecretRegistry, SecretStore},
    tool::{provision_tool, BuildTool},
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Tool home copied into the workspace before the first stage
#[derive(Debug, Clone)]
struct Provisioning {
    home: PathBuf,
    launcher: Option<PathBuf>,
}

/// Main pipeline execution engine
pub struct PipelineEngine<T> {
    stages: StageExecutor<T>,
    interrupt: Interrupt,
    events: EventHandlers,
    provisioning: Option<Provisioning>,
}

impl<T: BuildTool> PipelineEngine<T> {
    pub fn new(tool: T, store: Arc<dyn SecretStore>) -> Self {
        Self {
            stages: StageExecutor::new(tool, store),
            interrupt: Interrupt::new(),
            events: EventHandlers::new(),
            provisioning: None,
        }
    }

    pub fn with_binders(mut self, binders: Binders) -> Self {
        self.stages = self.stages.with_binders(binders);
        self
    }

    /// Share a registry with an outside observer, such as a log redactor
    pub fn with_registry(mut self, registry: SecretRegistry) -> Self {
        self.stages = self.stages.with_registry(registry);
        self
    }

    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Copy `home` into the workspace tool dir before running any stage
    pub fn with_tool_provisioning(
        mut self,
        home: impl Into<PathBuf>,
        launcher: Option<PathBuf>,
    ) -> Self {
        self.provisioning = Some(Provisioning {
            home: home.into(),
            launcher,
        });
        self
    }

    pub fn registry(&self) -> &SecretRegistry {
        self.stages.registry()
    }

    /// Handle the host can use to interrupt a run
    pub fn interrupt_handle(&self) -> Interrupt {
        self.interrupt.clone()
    }

    pub fn stage_executor(&self) -> &StageExecutor<T> {
        &self.stages
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.events.add(handler);
    }

    /// Execute a pipeline in a fresh run rooted at `workspace`
    pub async fn execute(
        &self,
        pipeline: &Pipeline,
        selection: &StageSelection,
        workspace: Workspace,
    ) -> Result<bool, PipelineError> {
        let mut run = RunContext::new(workspace);
        self.run(pipeline, selection, &mut run).await
    }

    /// Execute a pipeline within an existing run context
    ///
    /// Only configuration and provisioning problems are errors, and both
    /// happen before any stage runs. Everything else is the boolean.
    pub async fn run(
        &self,
        pipeline: &Pipeline,
        selection: &StageSelection,
        run: &mut RunContext,
    ) -> Result<bool, PipelineError> {
        let stages = pipeline.select_stages(selection)?;

        if let Some(provisioning) = &self.provisioning {
            provision_tool(
                &provisioning.home,
                &run.workspace,
                provisioning.launcher.as_deref(),
            )
            .await
            .map_err(|source| PipelineError::Provisioning {
                home: provisioning.home.display().to_string(),
                source,
            })?;
        }

        for (key, value) in &pipeline.environment {
            run.environment
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }

        info!("Starting pipeline execution: {} ({})", pipeline.name, run.run_id);
        self.events.emit(ExecutionEvent::PipelineStarted {
            run_id: run.run_id,
            pipeline_name: pipeline.name.clone(),
            stages: stages.iter().map(|s| s.name.clone()).collect(),
        });

        let mut success = !stages.is_empty();
        if stages.is_empty() {
            warn!("No stages to run for pipeline {}", pipeline.name);
        }

        for stage in stages {
            success = self
                .stages
                .execute(stage, run, &self.interrupt, &self.events)
                .await;
            if !success {
                error!("Pipeline {} stopped at stage {}", pipeline.name, stage.name);
                break;
            }
        }

        info!(
            "Pipeline {} finished: {}",
            pipeline.name,
            if success { "success" } else { "failure" }
        );
        self.events.emit(ExecutionEvent::PipelineFinished {
            run_id: run.run_id,
            success,
        });
        Ok(success)
    }
}
