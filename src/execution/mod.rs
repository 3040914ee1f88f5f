//! Pipeline execution - environment merge, step, stage and pipeline runners

pub mod engine;
pub mod environment;
pub mod events;
pub mod executor;
pub mod interrupt;
pub mod stage;

pub use engine::PipelineEngine;
pub use environment::merge_stage_environment;
pub use events::{EventHandler, EventHandlers, ExecutionEvent};
pub use executor::{StepError, StepExecutor, StepOutcome, STEP_ID_PROPERTY, WORKSPACE_DIR_PROPERTY};
pub use interrupt::Interrupt;
pub use stage::StageExecutor;
