//! Stage skip conditions

use crate::core::config::SkipConfig;
use regex::Regex;
use std::collections::HashMap;

/// Pattern for matching an environment value (not serializable due to Regex)
#[derive(Debug, Clone)]
pub enum ConditionPattern {
    /// Whole-value equality
    Exact(String),
    /// Simple string contains match
    Contains(String),
    /// Regular expression match
    Regex(Regex),
}

impl ConditionPattern {
    /// Check if the pattern matches the given text
    pub fn matches(&self, text: &str) -> bool {
        match self {
            ConditionPattern::Exact(expected) => text == expected,
            ConditionPattern::Contains(pattern) => text.contains(pattern.as_str()),
            ConditionPattern::Regex(regex) => regex.is_match(text),
        }
    }
}

/// When a stage is skipped, evaluated against the merged stage environment
#[derive(Debug, Clone, Default)]
pub enum SkipCondition {
    #[default]
    Never,
    Always,
    /// Skip when the variable is present and non-empty
    VarSet(String),
    /// Skip when the variable is present and its value matches
    VarMatches {
        var: String,
        pattern: ConditionPattern,
    },
}

impl SkipCondition {
    /// Build a skip condition from its configuration
    pub fn from_config(config: Option<&SkipConfig>) -> Self {
        let Some(config) = config else {
            return SkipCondition::Never;
        };

        match config {
            SkipConfig::Flag(true) => SkipCondition::Always,
            SkipConfig::Flag(false) => SkipCondition::Never,
            SkipConfig::Rule(rule) => {
                if let Some(expected) = &rule.equals {
                    SkipCondition::VarMatches {
                        var: rule.var.clone(),
                        pattern: ConditionPattern::Exact(expected.clone()),
                    }
                } else if let Some(pattern) = &rule.matches {
                    let pattern = if rule.use_regex {
                        match Regex::new(pattern) {
                            Ok(regex) => ConditionPattern::Regex(regex),
                            Err(_) => ConditionPattern::Contains(pattern.clone()),
                        }
                    } else {
                        ConditionPattern::Contains(pattern.clone())
                    };
                    SkipCondition::VarMatches {
                        var: rule.var.clone(),
                        pattern,
                    }
                } else {
                    SkipCondition::VarSet(rule.var.clone())
                }
            }
        }
    }

    /// Evaluate the condition
    pub fn should_skip(&self, environment: &HashMap<String, String>) -> bool {
        match self {
            SkipCondition::Never => false,
            SkipCondition::Always => true,
            SkipCondition::VarSet(var) => environment.get(var).is_some_and(|v| !v.is_empty()),
            SkipCondition::VarMatches { var, pattern } => environment
                .get(var)
                .is_some_and(|value| pattern.matches(value)),
        }
    }
}
