//! Stage environment merge

use crate::execution::Interrupt;
use crate::secrets::{BindContext, Binders, BindingError, EnvValue, SecretScope};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Merge a stage's raw environment over the accumulated one
///
/// Literal entries are applied first, then each secret reference is bound
/// and its variables applied, so secret projections win name collisions.
/// Every bound secret is handed to `scope` as soon as it exists, so a
/// failure or interruption part way through still leaves it releasable.
pub async fn merge_stage_environment(
    accumulated: &HashMap<String, String>,
    stage_env: &BTreeMap<String, String>,
    binders: &Binders,
    ctx: &BindContext<'_>,
    scope: &mut SecretScope,
    interrupt: &Interrupt,
) -> Result<HashMap<String, String>, BindingError> {
    let mut merged = accumulated.clone();
    let mut references = Vec::new();

    for (key, raw) in stage_env {
        match EnvValue::resolve(raw) {
            EnvValue::Literal(value) => {
                merged.insert(key.clone(), value.to_string());
            }
            EnvValue::Secret(reference) => references.push((key, reference)),
        }
    }

    for (key, reference) in references {
        let bound = tokio::select! {
            biased;
            _ = interrupt.triggered() => return Err(BindingError::Interrupted(key.clone())),
            result = binders.bind(key, &reference, ctx) => result?,
        };

        debug!("Bound {} ({} variables)", key, bound.variables().len());
        merged.extend(bound.variables().iter().cloned());
        scope.adopt(bound);
    }

    Ok(merged)
}
