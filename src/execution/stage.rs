//! Stage executor - bind, skip check, steps, after-steps, unbind

use crate::{
    core::{RunContext, Stage, Step},
    execution::{
        environment::merge_stage_environment, EventHandlers, ExecutionEvent, Interrupt,
        StepExecutor, StepOutcome,
    },
    secrets::{BindContext, Binders, EnvValue, SecretRegistry, SecretScope, SecretStore},
    tool::BuildTool,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};

/// How a list of steps ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepsResult {
    Succeeded,
    Failed,
    Interrupted,
}

/// Runs one stage with its secrets scoped to the stage
pub struct StageExecutor<T> {
    steps: StepExecutor<T>,
    binders: Binders,
    store: Arc<dyn SecretStore>,
    registry: SecretRegistry,
}

impl<T: BuildTool> StageExecutor<T> {
    pub fn new(tool: T, store: Arc<dyn SecretStore>) -> Self {
        Self {
            steps: StepExecutor::new(tool),
            binders: Binders::default(),
            store,
            registry: SecretRegistry::new(),
        }
    }

    pub fn with_binders(mut self, binders: Binders) -> Self {
        self.binders = binders;
        self
    }

    pub fn with_registry(mut self, registry: SecretRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &SecretRegistry {
        &self.registry
    }

    pub fn step_executor(&self) -> &StepExecutor<T> {
        &self.steps
    }

    /// Execute a stage and report success
    ///
    /// Secrets bound for the stage are unbound before this returns, on
    /// every path. Their variables are then removed from the run
    /// environment again.
    pub async fn execute(
        &self,
        stage: &Stage,
        run: &mut RunContext,
        interrupt: &Interrupt,
        events: &EventHandlers,
    ) -> bool {
        let span = info_span!("stage", stage = %stage.name);
        async move {
            info!("Starting stage: {}", stage.name);
            events.emit(ExecutionEvent::StageStarted {
                stage: stage.name.clone(),
            });

            let before = run.environment.clone();
            let mut scope = SecretScope::new(run.run_id, self.registry.clone());

            let success = self.run_bound(stage, run, &mut scope, interrupt, events).await;

            let bound_variables = scope.bound_variables();
            let report = scope.release();
            if report.failed > 0 {
                warn!("{} of {} secrets failed to unbind", report.failed, report.total());
            }
            restore_after_unbind(&mut run.environment, &bound_variables, stage, &before);

            if success {
                info!("Stage {} completed successfully", stage.name);
            } else {
                error!(stage = %stage.name, "Stage failed");
            }
            events.emit(ExecutionEvent::StageFinished {
                stage: stage.name.clone(),
                success,
                secrets_released: report.total(),
            });
            success
        }
        .instrument(span)
        .await
    }

    async fn run_bound(
        &self,
        stage: &Stage,
        run: &mut RunContext,
        scope: &mut SecretScope,
        interrupt: &Interrupt,
        events: &EventHandlers,
    ) -> bool {
        let ctx = BindContext {
            store: self.store.as_ref(),
            workspace: &run.workspace,
        };
        let merged = merge_stage_environment(
            &run.environment,
            &stage.environment,
            &self.binders,
            &ctx,
            scope,
            interrupt,
        )
        .await;

        match merged {
            Ok(environment) => run.environment = environment,
            Err(e) => {
                error!(stage = %stage.name, "Failed to bind stage environment: {}", e);
                return false;
            }
        }

        if stage.skip.should_skip(&run.environment) {
            warn!("Skipping stage {}: skip condition is true", stage.name);
            events.emit(ExecutionEvent::StageSkipped {
                stage: stage.name.clone(),
            });
            return true;
        }

        let main = self
            .run_steps(stage, &stage.steps, false, run, interrupt, events)
            .await;
        if main == StepsResult::Interrupted {
            warn!(stage = %stage.name, "Stage interrupted, skipping after-steps");
            return false;
        }

        let after = self
            .run_steps(stage, &stage.after_steps, true, run, interrupt, events)
            .await;
        if after == StepsResult::Interrupted {
            warn!(stage = %stage.name, "Stage interrupted during after-steps");
        }

        main == StepsResult::Succeeded && after == StepsResult::Succeeded
    }

    async fn run_steps(
        &self,
        stage: &Stage,
        steps: &[Step],
        after: bool,
        run: &RunContext,
        interrupt: &Interrupt,
        events: &EventHandlers,
    ) -> StepsResult {
        for step in steps {
            events.emit(ExecutionEvent::StepStarted {
                stage: stage.name.clone(),
                step_id: step.id.clone(),
                after,
            });

            let outcome = self
                .steps
                .execute(step, run, &self.registry, interrupt, events)
                .await;

            let error = match &outcome {
                StepOutcome::Succeeded => None,
                StepOutcome::Failed(e) => Some(e.to_string()),
                StepOutcome::Interrupted => Some("interrupted".to_string()),
            };
            events.emit(ExecutionEvent::StepFinished {
                step_id: step.id.clone(),
                success: outcome.is_success(),
                error,
            });

            match outcome {
                StepOutcome::Succeeded => {}
                StepOutcome::Failed(e) => {
                    error!(stage = %stage.name, step = %step.id, "Step failed: {}", e);
                    return StepsResult::Failed;
                }
                StepOutcome::Interrupted => return StepsResult::Interrupted,
            }
        }
        StepsResult::Succeeded
    }
}

/// Drop secret-derived variables from the run environment
///
/// A name that also has a literal entry in the stage keeps that literal;
/// otherwise it gets back whatever value it had before the stage.
fn restore_after_unbind(
    environment: &mut HashMap<String, String>,
    bound_variables: &[String],
    stage: &Stage,
    before: &HashMap<String, String>,
) {
    for name in bound_variables {
        let literal = stage.environment.get(name).and_then(|raw| match EnvValue::resolve(raw) {
            EnvValue::Literal(value) => Some(value.to_string()),
            EnvValue::Secret(_) => None,
        });

        match literal.or_else(|| before.get(name).cloned()) {
            Some(value) => {
                environment.insert(name.clone(), value);
            }
            None => {
                environment.remove(name);
            }
        }
    }
}
