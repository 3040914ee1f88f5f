//! Secret references, binders and the per-run secret registry
//!
//! Stage environment values of the form `secret://store/<kind>/<locator>`
//! are bound to one or more environment variables for the duration of a
//! stage and released when the stage ends.

pub mod binder;
pub mod reference;
pub mod registry;
pub mod scope;
pub mod store;

use thiserror::Error;

pub use binder::{BindContext, Binder, Binders, BoundSecret, SecretKind, Unbinder};
pub use reference::{EnvValue, SecretReference, SECRET_PREFIX, SECRET_STORE_NAME};
pub use registry::{SecretRegistry, REDACTION_MASK};
pub use scope::{ReleaseReport, SecretScope};
pub use store::{Credential, FileSecretStore, InMemorySecretStore, SecretStore};

/// Errors raised while binding a stage's secrets
#[derive(Debug, Error)]
pub enum BindingError {
    #[error("no binder for secret kind '{0}'")]
    UnknownKind(String),

    #[error("secret '{0}' not found")]
    NotFound(String),

    #[error("secret '{locator}' is a {actual} credential, expected {expected}")]
    WrongType {
        locator: String,
        expected: SecretKind,
        actual: &'static str,
    },

    #[error("secret store error: {0}")]
    Store(String),

    #[error("failed to materialize secret '{locator}': {source}")]
    Io {
        locator: String,
        #[source]
        source: std::io::Error,
    },

    #[error("interrupted while binding '{0}'")]
    Interrupted(String),
}
