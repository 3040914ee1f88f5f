//! Secret binders - one per secret kind

use crate::core::Workspace;
use crate::secrets::{BindingError, Credential, SecretReference, SecretStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

/// The closed set of secret kinds a reference can name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretKind {
    /// `<key>_USR` and `<key>_PSW`
    UsernamePassword,
    /// `<key>` as `user:password`
    UsernameColonPassword,
    /// `<key>` as the path of a materialized file
    File,
    /// `<key>_KEYFILE`, `<key>_USER` and `<key>_KEYPASSWORD`
    SshUserPrivateKey,
    /// `<key>` as the secret text
    Text,
}

impl SecretKind {
    pub const ALL: [SecretKind; 5] = [
        SecretKind::UsernamePassword,
        SecretKind::UsernameColonPassword,
        SecretKind::File,
        SecretKind::SshUserPrivateKey,
        SecretKind::Text,
    ];

    /// Accepted spellings, compared case-insensitively
    pub fn spellings(self) -> [&'static str; 2] {
        match self {
            SecretKind::UsernamePassword => ["usernamePassword", "UsernamePasswordMultiBinding"],
            SecretKind::UsernameColonPassword => ["usernameColonPassword", "UsernamePasswordBinding"],
            SecretKind::File => ["file", "FileBinding"],
            SecretKind::SshUserPrivateKey => ["sshUserPrivateKey", "SSHUserPrivateKeyBinding"],
            SecretKind::Text => ["string", "StringBinding"],
        }
    }
}

impl FromStr for SecretKind {
    type Err = BindingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SecretKind::ALL
            .into_iter()
            .find(|kind| kind.spellings().iter().any(|name| name.eq_ignore_ascii_case(s)))
            .ok_or_else(|| BindingError::UnknownKind(s.to_string()))
    }
}

impl fmt::Display for SecretKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spellings()[0])
    }
}

/// Releases whatever a binder acquired outside the environment
///
/// Synchronous, since it also runs from `Drop` when a stage future is
/// cancelled. Implementations must stay short and must not need the runtime.
pub trait Unbinder: Send + Sync {
    fn unbind(self: Box<Self>) -> io::Result<()>;
}

/// Removes a directory of materialized secret files
///
/// Uses blocking `std::fs`; the directory holds one or two small files.
#[derive(Debug)]
pub struct TempDirUnbinder {
    dir: PathBuf,
}

impl TempDirUnbinder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl Unbinder for TempDirUnbinder {
    fn unbind(self: Box<Self>) -> io::Result<()> {
        debug!("Removing secret material in {}", self.dir.display());
        match std::fs::remove_dir_all(&self.dir) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// Environment entries produced by binding one reference
///
/// Dropping a bound secret without calling [`BoundSecret::unbind`] still
/// releases it, with a warning.
pub struct BoundSecret {
    pub env_key: String,
    pub kind: SecretKind,
    values: Vec<(String, String)>,
    unbinder: Option<Box<dyn Unbinder>>,
}

impl BoundSecret {
    pub fn new(env_key: impl Into<String>, kind: SecretKind) -> Self {
        Self {
            env_key: env_key.into(),
            kind,
            values: Vec::new(),
            unbinder: None,
        }
    }

    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.push((name.into(), value.into()));
        self
    }

    pub fn with_unbinder(mut self, unbinder: Box<dyn Unbinder>) -> Self {
        self.unbinder = Some(unbinder);
        self
    }

    /// Variable name and value pairs, in production order
    pub fn variables(&self) -> &[(String, String)] {
        &self.values
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
    }

    /// Literal values to track for redaction
    pub fn secret_values(&self) -> impl Iterator<Item = &str> {
        self.values
            .iter()
            .map(|(_, value)| value.as_str())
            .filter(|v| !v.is_empty())
    }

    /// Release external resources; consumes the handle so it runs once
    pub fn unbind(mut self) -> io::Result<()> {
        match self.unbinder.take() {
            Some(unbinder) => unbinder.unbind(),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for BoundSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundSecret")
            .field("env_key", &self.env_key)
            .field("kind", &self.kind)
            .field("variables", &self.variable_names().collect::<Vec<_>>())
            .field("has_unbinder", &self.unbinder.is_some())
            .finish()
    }
}

impl Drop for BoundSecret {
    fn drop(&mut self) {
        if let Some(unbinder) = self.unbinder.take() {
            warn!("Secret bound to {} dropped without unbind, releasing", self.env_key);
            if let Err(e) = unbinder.unbind() {
                warn!("Failed to release secret bound to {}: {}", self.env_key, e);
            }
        }
    }
}

/// What a binder can reach while binding
#[derive(Clone, Copy)]
pub struct BindContext<'a> {
    pub store: &'a dyn SecretStore,
    pub workspace: &'a Workspace,
}

/// Trait for secret binders - one implementation per kind
#[async_trait]
pub trait Binder: Send + Sync {
    fn kind(&self) -> SecretKind;

    /// Acquire the secret at `locator` and project it onto `env_key`
    async fn bind(
        &self,
        env_key: &str,
        locator: &str,
        ctx: &BindContext<'_>,
    ) -> Result<BoundSecret, BindingError>;
}

fn wrong_type(locator: &str, expected: SecretKind, actual: &Credential) -> BindingError {
    BindingError::WrongType {
        locator: locator.to_string(),
        expected,
        actual: actual.type_name(),
    }
}

/// Write `files` into a fresh owner-only directory under the workspace
async fn materialize(
    workspace: &Workspace,
    locator: &str,
    files: &[(&str, &str)],
) -> Result<(PathBuf, Vec<PathBuf>), BindingError> {
    let dir = workspace.secrets_dir().join(Uuid::new_v4().to_string());
    let io_error = |source: io::Error| BindingError::Io {
        locator: locator.to_string(),
        source,
    };

    create_private_dir(&dir).await.map_err(io_error)?;

    let mut written = Vec::with_capacity(files.len());
    for (name, content) in files {
        let path = dir.join(safe_file_name(name));
        if let Err(e) = write_private(&path, content).await {
            let _ = tokio::fs::remove_dir_all(&dir).await;
            return Err(io_error(e));
        }
        written.push(path);
    }

    Ok((dir, written))
}

fn safe_file_name(name: &str) -> &str {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("secret")
}

async fn create_private_dir(dir: &Path) -> io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700)).await?;
    }
    Ok(())
}

async fn write_private(path: &Path, content: &str) -> io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(content.as_bytes()).await?;
    file.flush().await
}

#[derive(Debug, Default)]
pub struct UsernamePasswordBinder;

#[async_trait]
impl Binder for UsernamePasswordBinder {
    fn kind(&self) -> SecretKind {
        SecretKind::UsernamePassword
    }

    async fn bind(
        &self,
        env_key: &str,
        locator: &str,
        ctx: &BindContext<'_>,
    ) -> Result<BoundSecret, BindingError> {
        match ctx.store.lookup(locator).await? {
            Credential::UsernamePassword { username, password } => {
                Ok(BoundSecret::new(env_key, self.kind())
                    .with_value(format!("{}_USR", env_key), username)
                    .with_value(format!("{}_PSW", env_key), password))
            }
            other => Err(wrong_type(locator, self.kind(), &other)),
        }
    }
}

#[derive(Debug, Default)]
pub struct UsernameColonPasswordBinder;

#[async_trait]
impl Binder for UsernameColonPasswordBinder {
    fn kind(&self) -> SecretKind {
        SecretKind::UsernameColonPassword
    }

    async fn bind(
        &self,
        env_key: &str,
        locator: &str,
        ctx: &BindContext<'_>,
    ) -> Result<BoundSecret, BindingError> {
        match ctx.store.lookup(locator).await? {
            Credential::UsernamePassword { username, password } => Ok(
                BoundSecret::new(env_key, self.kind())
                    .with_value(env_key, format!("{}:{}", username, password)),
            ),
            other => Err(wrong_type(locator, self.kind(), &other)),
        }
    }
}

#[derive(Debug, Default)]
pub struct FileBinder;

#[async_trait]
impl Binder for FileBinder {
    fn kind(&self) -> SecretKind {
        SecretKind::File
    }

    async fn bind(
        &self,
        env_key: &str,
        locator: &str,
        ctx: &BindContext<'_>,
    ) -> Result<BoundSecret, BindingError> {
        let (file_name, content) = match ctx.store.lookup(locator).await? {
            Credential::File { file_name, content } => (file_name, content),
            other => return Err(wrong_type(locator, self.kind(), &other)),
        };

        let (dir, files) = materialize(ctx.workspace, locator, &[(&file_name, &content)]).await?;
        let path = files.into_iter().next().unwrap_or_else(|| dir.join(&file_name));

        Ok(BoundSecret::new(env_key, self.kind())
            .with_value(env_key, path.to_string_lossy())
            .with_unbinder(Box::new(TempDirUnbinder::new(dir))))
    }
}

#[derive(Debug, Default)]
pub struct SshUserPrivateKeyBinder;

#[async_trait]
impl Binder for SshUserPrivateKeyBinder {
    fn kind(&self) -> SecretKind {
        SecretKind::SshUserPrivateKey
    }

    async fn bind(
        &self,
        env_key: &str,
        locator: &str,
        ctx: &BindContext<'_>,
    ) -> Result<BoundSecret, BindingError> {
        match ctx.store.lookup(locator).await? {
            Credential::SshUserPrivateKey {
                username,
                private_key,
                passphrase,
            } => {
                let (dir, files) =
                    materialize(ctx.workspace, locator, &[("ssh-key", &private_key)]).await?;
                let key_file = files
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| dir.join("ssh-key"));

                Ok(BoundSecret::new(env_key, self.kind())
                    .with_value(format!("{}_KEYFILE", env_key), key_file.to_string_lossy())
                    .with_value(format!("{}_USER", env_key), username)
                    .with_value(
                        format!("{}_KEYPASSWORD", env_key),
                        passphrase.unwrap_or_default(),
                    )
                    .with_unbinder(Box::new(TempDirUnbinder::new(dir))))
            }
            other => Err(wrong_type(locator, self.kind(), &other)),
        }
    }
}

#[derive(Debug, Default)]
pub struct StringBinder;

#[async_trait]
impl Binder for StringBinder {
    fn kind(&self) -> SecretKind {
        SecretKind::Text
    }

    async fn bind(
        &self,
        env_key: &str,
        locator: &str,
        ctx: &BindContext<'_>,
    ) -> Result<BoundSecret, BindingError> {
        match ctx.store.lookup(locator).await? {
            Credential::Text { secret } => {
                Ok(BoundSecret::new(env_key, self.kind()).with_value(env_key, secret))
            }
            other => Err(wrong_type(locator, self.kind(), &other)),
        }
    }
}

/// Binder registry keyed by kind
pub struct Binders {
    binders: HashMap<SecretKind, Box<dyn Binder>>,
}

impl Binders {
    /// A registry with no binders
    pub fn empty() -> Self {
        Self {
            binders: HashMap::new(),
        }
    }

    /// Register a binder, replacing any existing one for its kind
    pub fn register(&mut self, binder: Box<dyn Binder>) {
        self.binders.insert(binder.kind(), binder);
    }

    pub fn with(mut self, binder: impl Binder + 'static) -> Self {
        self.register(Box::new(binder));
        self
    }

    pub fn get(&self, kind: SecretKind) -> Option<&dyn Binder> {
        self.binders.get(&kind).map(|b| b.as_ref())
    }

    /// Bind one reference through the binder for its kind
    pub async fn bind(
        &self,
        env_key: &str,
        reference: &SecretReference,
        ctx: &BindContext<'_>,
    ) -> Result<BoundSecret, BindingError> {
        let kind: SecretKind = reference.kind.parse()?;
        let binder = self
            .get(kind)
            .ok_or_else(|| BindingError::UnknownKind(reference.kind.clone()))?;

        debug!("Binding {} as {} secret '{}'", env_key, kind, reference.locator);
        binder.bind(env_key, &reference.locator, ctx).await
    }
}

impl Default for Binders {
    fn default() -> Self {
        Self::empty()
            .with(UsernamePasswordBinder)
            .with(UsernameColonPasswordBinder)
            .with(FileBinder)
            .with(SshUserPrivateKeyBinder)
            .with(StringBinder)
    }
}
