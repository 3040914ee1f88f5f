//! Step domain model

use crate::core::config::{values_as_string_map, StepConfig};
use std::collections::{BTreeMap, HashMap};

/// A single build tool invocation inside a stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Which external step implementation to invoke
    pub id: String,

    /// Raw properties, may reference `${VAR}` from the environment
    pub properties: BTreeMap<String, String>,
}

fn is_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

/// Expand `${VAR}` references; unknown references are left verbatim
pub fn expand_variables(template: &str, variables: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        match after.find('}') {
            Some(end) if is_variable_name(&after[..end]) => {
                match variables.get(&after[..end]) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&rest[start..start + end + 3]),
                }
                rest = &after[end + 1..];
            }
            _ => {
                out.push_str("${");
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

impl Step {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Create a step from a step config
    pub fn from_config(config: &StepConfig) -> Self {
        Self {
            id: config.id.clone(),
            properties: values_as_string_map(&config.properties),
        }
    }

    /// Properties with variable references expanded
    pub fn resolve_properties(&self, variables: &HashMap<String, String>) -> BTreeMap<String, String> {
        self.properties
            .iter()
            .map(|(k, v)| (k.clone(), expand_variables(v, variables)))
            .collect()
    }
}
