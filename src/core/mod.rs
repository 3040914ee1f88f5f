//! Core domain models for stageline
//!
//! This module defines the pipeline, stage and step structures, their YAML
//! configuration, skip conditions and the per-run context.

pub mod condition;
pub mod config;
pub mod context;
pub mod pipeline;
pub mod properties;
pub mod settings;
pub mod stage;
pub mod step;

pub use condition::*;
pub use context::*;
pub use pipeline::*;
pub use stage::*;
pub use step::*;
