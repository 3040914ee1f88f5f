//! Stage domain model

use crate::core::{
    condition::SkipCondition,
    config::{values_as_string_map, StageConfig},
    step::Step,
};
use std::collections::BTreeMap;

/// A named unit of environment bindings, steps and after-steps
#[derive(Debug, Clone)]
pub struct Stage {
    /// Stage name, unique within a pipeline
    pub name: String,

    /// When to skip the stage
    pub skip: SkipCondition,

    /// Raw environment; values may be secret references
    pub environment: BTreeMap<String, String>,

    /// Main steps, short-circuit on first failure
    pub steps: Vec<Step>,

    /// Cleanup steps, always run
    pub after_steps: Vec<Step>,
}

impl Stage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            skip: SkipCondition::Never,
            environment: BTreeMap::new(),
            steps: Vec::new(),
            after_steps: Vec::new(),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_after_step(mut self, step: Step) -> Self {
        self.after_steps.push(step);
        self
    }

    pub fn with_skip(mut self, skip: SkipCondition) -> Self {
        self.skip = skip;
        self
    }

    /// Create a stage from a stage config
    pub fn from_config(config: &StageConfig) -> Self {
        Self {
            name: config.name.clone(),
            skip: SkipCondition::from_config(config.skip.as_ref()),
            environment: values_as_string_map(&config.environment),
            steps: config.steps.iter().map(Step::from_config).collect(),
            after_steps: config.after_steps.iter().map(Step::from_config).collect(),
        }
    }
}
