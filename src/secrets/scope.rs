//! Stage-scoped ownership of bound secrets

use crate::core::RunId;
use crate::secrets::{BoundSecret, SecretRegistry};
use tracing::{debug, warn};

/// Outcome of releasing a scope
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseReport {
    /// Secrets whose unbind completed
    pub unbound: usize,
    /// Secrets whose unbind returned an error
    pub failed: usize,
}

impl ReleaseReport {
    pub fn total(&self) -> usize {
        self.unbound + self.failed
    }
}

/// Owns every secret bound during one stage execution
///
/// [`SecretScope::release`] unbinds them in creation order and clears the
/// run's registry entry. If the scope is dropped first, the same release
/// happens in `Drop`.
#[derive(Debug)]
pub struct SecretScope {
    run_id: RunId,
    registry: SecretRegistry,
    bound: Vec<BoundSecret>,
    released: bool,
}

impl SecretScope {
    pub fn new(run_id: RunId, registry: SecretRegistry) -> Self {
        Self {
            run_id,
            registry,
            bound: Vec::new(),
            released: false,
        }
    }

    /// Take ownership of a bound secret and track its values for redaction
    pub fn adopt(&mut self, secret: BoundSecret) {
        self.registry.register(self.run_id, secret.secret_values());
        self.bound.push(secret);
    }

    pub fn len(&self) -> usize {
        self.bound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }

    /// Names of every variable produced by the adopted secrets
    pub fn bound_variables(&self) -> Vec<String> {
        self.bound
            .iter()
            .flat_map(|s| s.variable_names().map(String::from))
            .collect()
    }

    /// Unbind everything exactly once
    pub fn release(mut self) -> ReleaseReport {
        self.release_all()
    }

    fn release_all(&mut self) -> ReleaseReport {
        let mut report = ReleaseReport::default();
        if self.released {
            return report;
        }
        self.released = true;

        for secret in self.bound.drain(..) {
            let env_key = secret.env_key.clone();
            match secret.unbind() {
                Ok(()) => {
                    debug!("Unbound secret {}", env_key);
                    report.unbound += 1;
                }
                Err(e) => {
                    warn!("Failed to unbind secret {}: {}", env_key, e);
                    report.failed += 1;
                }
            }
        }

        self.registry.clear(self.run_id);
        report
    }
}

impl Drop for SecretScope {
    fn drop(&mut self) {
        if !self.released {
            let report = self.release_all();
            if report.total() > 0 {
                warn!("Secret scope dropped before release, unbound {} secrets", report.total());
            }
        }
    }
}
