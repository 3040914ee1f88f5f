//! Pipeline domain model and stage selection

use crate::core::{config::PipelineConfig, config::values_as_string_map, stage::Stage};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Run properties key holding a comma-separated stage selection
pub const RUN_STAGES_KEY: &str = "run.stages";

/// Errors that abort a whole run before any stage executes
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("stage '{0}' is not configured")]
    StageNotFound(String),

    #[error("failed to provision build tool from {home}: {source}")]
    Provisioning {
        home: String,
        #[source]
        source: std::io::Error,
    },
}

/// Which stages a run executes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StageSelection {
    /// Every stage, in config order
    #[default]
    All,
    /// Only the named stages, in the order given
    Named(Vec<String>),
}

impl StageSelection {
    /// Parse a comma-separated list; empty input selects all stages
    pub fn parse(list: &str) -> Self {
        let names: Vec<String> = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        if names.is_empty() {
            StageSelection::All
        } else {
            StageSelection::Named(names)
        }
    }

    /// Selection from the run properties `run.stages` key
    pub fn from_run_properties(props: &BTreeMap<String, String>) -> Self {
        props
            .get(RUN_STAGES_KEY)
            .map(|list| Self::parse(list))
            .unwrap_or_default()
    }
}

/// A pipeline definition
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Pipeline name
    pub name: String,

    /// Pipeline-wide environment
    pub environment: HashMap<String, String>,

    /// Stages in config order
    pub stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>, stages: Vec<Stage>) -> Self {
        Self {
            name: name.into(),
            environment: HashMap::new(),
            stages,
        }
    }

    /// Create a pipeline from configuration
    pub fn from_config(config: &PipelineConfig) -> Self {
        Pipeline {
            name: config.name.clone(),
            environment: values_as_string_map(&config.environment).into_iter().collect(),
            stages: config.stages.iter().map(Stage::from_config).collect(),
        }
    }

    /// Get a stage by name
    pub fn stage(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Resolve a selection into the ordered stages to run
    ///
    /// Named selections keep the requested order. Any unknown name fails
    /// the whole selection.
    pub fn select_stages(&self, selection: &StageSelection) -> Result<Vec<&Stage>, PipelineError> {
        match selection {
            StageSelection::All => Ok(self.stages.iter().collect()),
            StageSelection::Named(names) => names
                .iter()
                .map(|name| {
                    self.stage(name)
                        .ok_or_else(|| PipelineError::StageNotFound(name.clone()))
                })
                .collect(),
        }
    }
}
