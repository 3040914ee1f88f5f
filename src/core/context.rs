//! Run context - workspace layout and the accumulated environment

use crate::core::properties;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Directory under the workspace holding step property files
pub const CI_DIR: &str = ".ci";

/// Directory under the workspace the build tool is provisioned into
pub const TOOL_DIR: &str = ".tool";

/// Run-scoped property overrides, looked up under [`CI_DIR`]
pub const RUN_PROPERTIES_FILE: &str = "run.properties";

/// Stable identifier of one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Filesystem root under which property files and secret material are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ci_dir(&self) -> PathBuf {
        self.root.join(CI_DIR)
    }

    pub fn tool_dir(&self) -> PathBuf {
        self.root.join(TOOL_DIR)
    }

    pub fn secrets_dir(&self) -> PathBuf {
        self.ci_dir().join("tmp").join("secrets")
    }

    pub fn run_properties_path(&self) -> PathBuf {
        self.ci_dir().join(RUN_PROPERTIES_FILE)
    }

    /// Fresh property file path for one step invocation
    ///
    /// Named `<step-id>-<yyyyMMddHHmmssSSS>.properties`; a numeric suffix is
    /// added if that name is already taken.
    pub fn step_property_file(&self, step_id: &str) -> PathBuf {
        let safe_id: String = step_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
            .collect();
        let stamp = chrono::Local::now().format("%Y%m%d%H%M%S%3f");

        let dir = self.ci_dir();
        let mut candidate = dir.join(format!("{}-{}.properties", safe_id, stamp));
        let mut n = 1;
        while candidate.exists() {
            candidate = dir.join(format!("{}-{}-{}.properties", safe_id, stamp, n));
            n += 1;
        }
        candidate
    }

    /// Load the run properties file; missing file yields an empty map
    pub async fn load_run_properties(&self) -> io::Result<BTreeMap<String, String>> {
        match properties::load(&self.run_properties_path()).await {
            Ok(props) => Ok(props),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e),
        }
    }
}

/// Execution context for one pipeline run
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Unique run identifier, keys the secret registry
    pub run_id: RunId,

    /// Where this run writes its files
    pub workspace: Workspace,

    /// Accumulated environment, grows stage by stage
    pub environment: HashMap<String, String>,
}

impl RunContext {
    /// Create a new context with an empty environment
    pub fn new(workspace: Workspace) -> Self {
        Self {
            run_id: RunId::new(),
            workspace,
            environment: HashMap::new(),
        }
    }

    /// Set a variable
    pub fn set_variable(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.environment.insert(key.into(), value.into());
    }

    /// Get a variable
    pub fn get_variable(&self, key: &str) -> Option<&String> {
        self.environment.get(key)
    }
}
