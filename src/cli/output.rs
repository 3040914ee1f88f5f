//! CLI output formatting

use crate::core::config::PipelineConfig;
use crate::execution::ExecutionEvent;
use console::Emoji;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");
pub static LOCK: Emoji<'_, '_> = Emoji("🔒 ", "# ");

fn short_id(id: &impl ToString) -> String {
    id.to_string().chars().take(8).collect()
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::PipelineStarted {
            run_id,
            pipeline_name,
            stages,
        } => format!(
            "{} Starting pipeline {} ({}) stages: {}",
            ROCKET,
            style(pipeline_name).bold(),
            style(short_id(run_id)).dim(),
            style(stages.join(", ")).cyan()
        ),
        ExecutionEvent::StageStarted { stage } => {
            format!("{} Stage {}", SPINNER, style(stage).bold())
        }
        ExecutionEvent::StageSkipped { stage } => {
            format!("{} Stage {} skipped", WARN, style(stage).yellow())
        }
        ExecutionEvent::StepStarted {
            step_id, after, ..
        } => {
            if *after {
                format!("  {} {} {}", SPINNER, style(step_id).cyan(), style("(after)").dim())
            } else {
                format!("  {} {}", SPINNER, style(step_id).cyan())
            }
        }
        ExecutionEvent::StepOutput { step_id, line } => {
            format!("    {} {}", style(format!("[{}]", step_id)).dim(), line)
        }
        ExecutionEvent::StepFinished {
            step_id,
            success,
            error,
        } => match (success, error) {
            (true, _) => format!("  {} {}", CHECK, style(step_id).green()),
            (false, Some(error)) => {
                format!("  {} {}: {}", CROSS, style(step_id).red(), style(error).dim())
            }
            (false, None) => format!("  {} {}", CROSS, style(step_id).red()),
        },
        ExecutionEvent::StageFinished {
            stage,
            success,
            secrets_released,
        } => {
            let status = if *success {
                style("succeeded").green().to_string()
            } else {
                style("failed").red().to_string()
            };
            if *secrets_released > 0 {
                format!(
                    "{} Stage {} {} {}{} secrets released",
                    if *success { CHECK } else { CROSS },
                    style(stage).bold(),
                    status,
                    LOCK,
                    secrets_released
                )
            } else {
                format!(
                    "{} Stage {} {}",
                    if *success { CHECK } else { CROSS },
                    style(stage).bold(),
                    status
                )
            }
        }
        ExecutionEvent::PipelineFinished { run_id, success } => {
            let status_str = if *success {
                format!("completed {}", style("successfully").green())
            } else {
                style("failed").red().to_string()
            };
            format!(
                "{} Pipeline ({}) {}",
                INFO,
                style(short_id(run_id)).dim(),
                status_str
            )
        }
    }
}

/// One line per stage with its step counts
pub fn format_stage_list(config: &PipelineConfig) -> Vec<String> {
    config
        .stages
        .iter()
        .enumerate()
        .map(|(i, stage)| {
            format!(
                "  {}. {} ({} steps, {} after-steps)",
                i + 1,
                style(&stage.name).bold(),
                style(stage.steps.len()).cyan(),
                style(stage.after_steps.len()).cyan()
            )
        })
        .collect()
}
