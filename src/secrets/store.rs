//! Secret store backends

use crate::secrets::BindingError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Credential material held by a store
///
/// In YAML each credential carries a `type` tag, for example
/// `{ type: usernamePassword, username: deploy, password: hunter2 }`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Credential {
    UsernamePassword {
        username: String,
        password: String,
    },
    File {
        file_name: String,
        content: String,
    },
    SshUserPrivateKey {
        username: String,
        private_key: String,
        #[serde(default)]
        passphrase: Option<String>,
    },
    #[serde(rename = "string")]
    Text { secret: String },
}

impl Credential {
    pub fn type_name(&self) -> &'static str {
        match self {
            Credential::UsernamePassword { .. } => "usernamePassword",
            Credential::File { .. } => "file",
            Credential::SshUserPrivateKey { .. } => "sshUserPrivateKey",
            Credential::Text { .. } => "string",
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::UsernamePassword { username, .. } => f
                .debug_struct("UsernamePassword")
                .field("username", username)
                .finish_non_exhaustive(),
            Credential::File { file_name, .. } => f
                .debug_struct("File")
                .field("file_name", file_name)
                .finish_non_exhaustive(),
            Credential::SshUserPrivateKey { username, .. } => f
                .debug_struct("SshUserPrivateKey")
                .field("username", username)
                .finish_non_exhaustive(),
            Credential::Text { .. } => f.debug_struct("Text").finish_non_exhaustive(),
        }
    }
}

/// Trait for secret storage backends
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch the credential stored under `locator`
    async fn lookup(&self, locator: &str) -> Result<Credential, BindingError>;
}

/// Store backed by a map, for embedding and tests
#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    credentials: RwLock<HashMap<String, Credential>>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(self, locator: impl Into<String>, credential: Credential) -> Self {
        self.insert(locator, credential);
        self
    }

    pub fn insert(&self, locator: impl Into<String>, credential: Credential) {
        if let Ok(mut map) = self.credentials.write() {
            map.insert(locator.into(), credential);
        }
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn lookup(&self, locator: &str) -> Result<Credential, BindingError> {
        let map = self
            .credentials
            .read()
            .map_err(|_| BindingError::Store("credential map poisoned".to_string()))?;
        map.get(locator)
            .cloned()
            .ok_or_else(|| BindingError::NotFound(locator.to_string()))
    }
}

/// Store backed by a YAML file mapping locator to credential
///
/// The file is read on every lookup so rotated credentials are picked up
/// between stages.
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    path: PathBuf,
}

impl FileSecretStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<HashMap<String, Credential>, BindingError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            BindingError::Store(format!("failed to read {}: {}", self.path.display(), e))
        })?;
        serde_yaml::from_str(&content).map_err(|e| {
            BindingError::Store(format!("failed to parse {}: {}", self.path.display(), e))
        })
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn lookup(&self, locator: &str) -> Result<Credential, BindingError> {
        self.load()
            .await?
            .remove(locator)
            .ok_or_else(|| BindingError::NotFound(locator.to_string()))
    }
}
