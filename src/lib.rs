//! stageline - declarative multi-stage build pipelines with scoped secret bindings

pub mod cli;
pub mod core;
pub mod execution;
pub mod secrets;
pub mod tool;

// Re-export commonly used types
pub use self::core::{Pipeline, PipelineError, RunContext, RunId, Stage, StageSelection, Step, Workspace};
pub use execution::{ExecutionEvent, Interrupt, PipelineEngine, StepOutcome};
pub use secrets::{BindingError, Credential, FileSecretStore, InMemorySecretStore, SecretRegistry, SecretStore};
pub use tool::{BuildTool, CommandTool, ToolConfig, ToolError};
