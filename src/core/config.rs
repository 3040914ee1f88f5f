//! Pipeline configuration from YAML

use crate::core::Pipeline;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Top-level pipeline configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Pipeline name
    #[serde(default = "default_pipeline_name")]
    pub name: String,

    /// Pipeline-wide environment, seeds every run
    #[serde(default)]
    pub environment: BTreeMap<String, Value>,

    /// Stages in execution order
    #[serde(default)]
    pub stages: Vec<StageConfig>,
}

/// Stage configuration as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageConfig {
    /// Stage name, unique within the pipeline
    pub name: String,

    /// Skip condition (default: never skip)
    #[serde(default)]
    pub skip: Option<SkipConfig>,

    /// Stage environment; values may be `secret://` references
    #[serde(default)]
    pub environment: BTreeMap<String, Value>,

    /// Steps run in order, stopping at the first failure
    #[serde(default)]
    pub steps: Vec<StepConfig>,

    /// Steps that always run after `steps`
    #[serde(default, alias = "afterSteps")]
    pub after_steps: Vec<StepConfig>,
}

/// Step configuration as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepConfig {
    /// Which build tool step to invoke
    pub id: String,

    /// Properties handed to the build tool
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

/// Skip configuration: `skip: true` or a rule on one variable
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SkipConfig {
    Flag(bool),
    Rule(SkipRuleConfig),
}

/// Skip rule on a single environment variable
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SkipRuleConfig {
    /// Variable to inspect
    pub var: String,

    /// Skip when the value equals this exactly
    #[serde(default)]
    pub equals: Option<String>,

    /// Skip when the value matches this pattern
    #[serde(default)]
    pub matches: Option<String>,

    /// Whether `matches` is a regular expression
    #[serde(default)]
    pub use_regex: bool,
}

fn default_pipeline_name() -> String {
    "pipeline".to_string()
}

/// Render a YAML scalar as the string the build tool sees
pub fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        // Fallback: serialize nested values
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Render a YAML mapping as a string map
pub fn values_as_string_map(values: &BTreeMap<String, Value>) -> BTreeMap<String, String> {
    values
        .iter()
        .map(|(k, v)| (k.clone(), scalar_to_string(v)))
        .collect()
}

impl PipelineConfig {
    /// Load pipeline configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse pipeline configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the pipeline configuration
    pub fn validate(&self) -> Result<()> {
        let mut seen_names = HashSet::new();

        for stage in &self.stages {
            if stage.name.trim().is_empty() {
                anyhow::bail!("Stage name must not be empty");
            }
            if stage.name.contains(',') {
                anyhow::bail!("Stage name '{}' must not contain ','", stage.name);
            }
            if !seen_names.insert(stage.name.as_str()) {
                anyhow::bail!("Duplicate stage name: {}", stage.name);
            }

            for step in stage.steps.iter().chain(&stage.after_steps) {
                if step.id.trim().is_empty() {
                    anyhow::bail!("Stage '{}' has a step without an id", stage.name);
                }
            }

            if let Some(SkipConfig::Rule(rule)) = &stage.skip {
                if rule.equals.is_some() && rule.matches.is_some() {
                    anyhow::bail!(
                        "Stage '{}' skip rule sets both 'equals' and 'matches'",
                        stage.name
                    );
                }
                if let (Some(pattern), true) = (&rule.matches, rule.use_regex) {
                    if let Err(e) = regex::Regex::new(pattern) {
                        anyhow::bail!(
                            "Stage '{}' skip pattern is not a valid regex: {}",
                            stage.name,
                            e
                        );
                    }
                }
            }
        }

        Ok(())
    }

    /// Stage names in config order
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }

    /// Convert config to a Pipeline domain model
    pub fn to_pipeline(&self) -> Pipeline {
        Pipeline::from_config(self)
    }
}
