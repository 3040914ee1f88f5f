//! Live secret values per run, used for output redaction

use crate::core::RunId;
use dashmap::DashMap;
use std::sync::Arc;

/// Replacement text for a redacted secret
pub const REDACTION_MASK: &str = "****";

/// Secret literals currently bound for each active run
///
/// Keyed by [`RunId`] only. Holding an entry never keeps a run alive; the
/// owning stage clears it when it unbinds.
#[derive(Debug, Clone, Default)]
pub struct SecretRegistry {
    runs: Arc<DashMap<RunId, Vec<String>>>,
}

impl SecretRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track values for a run; empty and duplicate values are ignored
    pub fn register<I, S>(&self, run_id: RunId, values: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut entry = self.runs.entry(run_id).or_default();
        for value in values {
            let value = value.as_ref();
            if !value.is_empty() && !entry.iter().any(|v| v == value) {
                entry.push(value.to_string());
            }
        }
    }

    /// Forget every value tracked for a run
    pub fn clear(&self, run_id: RunId) {
        self.runs.remove(&run_id);
    }

    /// Snapshot of the values tracked for a run
    pub fn secrets_for(&self, run_id: RunId) -> Vec<String> {
        self.runs
            .get(&run_id)
            .map(|values| values.value().clone())
            .unwrap_or_default()
    }

    pub fn contains_secret(&self, run_id: RunId, value: &str) -> bool {
        self.runs
            .get(&run_id)
            .is_some_and(|values| values.iter().any(|v| v == value))
    }

    /// Runs with at least one tracked value
    pub fn active_runs(&self) -> Vec<RunId> {
        self.runs
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| *entry.key())
            .collect()
    }

    /// Replace every live secret of `run_id` in `text` with the mask
    ///
    /// Longer values are replaced first so a secret containing another
    /// secret is masked whole.
    pub fn redact(&self, run_id: RunId, text: &str) -> String {
        let mut secrets = self.secrets_for(run_id);
        if secrets.is_empty() {
            return text.to_string();
        }

        secrets.sort_by_key(|s| std::cmp::Reverse(s.len()));
        secrets
            .iter()
            .fold(text.to_string(), |acc, secret| acc.replace(secret.as_str(), REDACTION_MASK))
    }
}
