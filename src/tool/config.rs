//! Build tool configuration

use crate::core::Workspace;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Placeholder for the provisioned tool directory in program and arguments
pub const TOOL_DIR_PLACEHOLDER: &str = "{tool_dir}";

/// Placeholder for the workspace root in program and arguments
pub const WORKSPACE_PLACEHOLDER: &str = "{workspace}";

/// How the external build tool is launched for each step
///
/// The command line is
/// `<program> <args...> <subcommand> <property_file_flag> <file> <extra_args...>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// Executable to run
    pub program: String,

    /// Arguments placed before the sub-command
    pub args: Vec<String>,

    /// Fixed sub-command selecting step execution
    pub subcommand: String,

    /// Flag introducing the generated property file
    pub property_file_flag: String,

    /// Arguments placed after the property file
    pub extra_args: Vec<String>,

    /// Directory copied into the workspace tool dir before the first stage
    pub home: Option<PathBuf>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            program: format!("{}/tools/ant/bin/ant", TOOL_DIR_PLACEHOLDER),
            args: vec!["-f".to_string(), format!("{}/run.xml", TOOL_DIR_PLACEHOLDER)],
            subcommand: "step".to_string(),
            property_file_flag: "-propertyfile".to_string(),
            extra_args: vec![
                "-logger".to_string(),
                "org.apache.tools.ant.NoBannerLogger".to_string(),
            ],
            home: None,
        }
    }
}

impl ToolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_extra_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// Substitute `{tool_dir}` and `{workspace}` placeholders
    pub fn expand(&self, value: &str, workspace: &Workspace) -> String {
        value
            .replace(TOOL_DIR_PLACEHOLDER, &workspace.tool_dir().to_string_lossy())
            .replace(WORKSPACE_PLACEHOLDER, &workspace.root().to_string_lossy())
    }

    /// Full command line for one step invocation
    pub fn command_line(&self, workspace: &Workspace, property_file: &Path) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + self.extra_args.len() + 4);
        argv.push(self.expand(&self.program, workspace));
        argv.extend(self.args.iter().map(|a| self.expand(a, workspace)));
        argv.push(self.subcommand.clone());
        argv.push(self.property_file_flag.clone());
        argv.push(property_file.to_string_lossy().into_owned());
        argv.extend(self.extra_args.iter().map(|a| self.expand(a, workspace)));
        argv
    }

    /// Launcher path relative to the tool dir, when the program lives there
    pub fn provisioned_launcher(&self) -> Option<PathBuf> {
        self.program
            .strip_prefix(TOOL_DIR_PLACEHOLDER)
            .map(|rest| PathBuf::from(rest.trim_start_matches('/')))
            .filter(|rel| !rel.as_os_str().is_empty())
    }
}
