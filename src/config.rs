use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::errors::ConfigError;
use crate::project::{ProjectContext, remote_dir, resolve_project_name};
use crate::runner::shell_quote;
use crate::slurmssh_config::ToolCommands;

/// The `username@host` pair every remote invocation targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    pub username: String,
    pub host: String,
}

impl ConnectionTarget {
    pub fn new(username: impl Into<String>, host: impl Into<String>) -> Result<Self, ConfigError> {
        let username = username.into();
        let host = host.into();
        if username.is_empty() || host.is_empty() {
            return Err(ConfigError::InvalidConnection {
                value: format!("{}@{}", username, host),
            });
        }
        Ok(Self { username, host })
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.username, self.host)
    }
}

/// Parses `username@host`, splitting on the first `@`.
impl FromStr for ConnectionTarget {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidConnection {
            value: s.to_string(),
        };
        let (username, host) = s.split_once('@').ok_or_else(invalid)?;
        Self::new(username, host).map_err(|_| invalid())
    }
}

/// Per-run session settings. Built once, read-only afterwards.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub target: ConnectionTarget,
    /// Path of the batch file handed to `sbatch`, relative to the project root.
    pub launch_script_path: PathBuf,
    pub project_name: String,
    /// `~/<namespace>/<project_name>/` on the remote host.
    pub remote_dir: String,
    /// Program names for ssh, rsync and sbatch.
    pub tools: ToolCommands,
}

impl SessionConfig {
    /// Build a session, deriving the project name from `ctx` and the launch
    /// script path.
    pub fn new(
        target: ConnectionTarget,
        launch_script_path: impl Into<PathBuf>,
        ctx: &ProjectContext,
        namespace: &str,
    ) -> Self {
        let launch_script_path = launch_script_path.into();
        let project_name =
            resolve_project_name(ctx.manifest.as_deref(), &launch_script_path, &ctx.cwd_name);
        Self::with_project_name(target, launch_script_path, project_name, namespace)
    }

    pub fn with_project_name(
        target: ConnectionTarget,
        launch_script_path: impl Into<PathBuf>,
        project_name: impl Into<String>,
        namespace: &str,
    ) -> Self {
        let launch_script_path = launch_script_path.into();
        if launch_script_path.is_absolute() {
            tracing::warn!(
                path = %launch_script_path.display(),
                "launch script path is absolute; sbatch resolves it on the remote host, not inside the synced directory"
            );
        }
        let project_name = project_name.into();
        let remote_dir = remote_dir(namespace, &project_name);
        Self {
            target,
            launch_script_path,
            project_name,
            remote_dir,
            tools: ToolCommands::default(),
        }
    }

    pub fn with_tools(mut self, tools: ToolCommands) -> Self {
        self.tools = tools;
        self
    }

    /// `remote_dir` as a remote shell word: the leading `~/` stays bare so it
    /// expands, and the rest is single-quoted if it holds spaces or shell
    /// metacharacters.
    pub fn remote_dir_for_shell(&self) -> String {
        match self.remote_dir.strip_prefix("~/") {
            Some(rest) => format!("~/{}", shell_quote(rest)),
            None => shell_quote(&self.remote_dir),
        }
    }

    /// The launch script path as it appears on the remote command line.
    pub fn remote_script(&self) -> String {
        path_for_remote(&self.launch_script_path)
    }
}

/// Render a local relative path with `/` separators for the remote shell.
pub fn path_for_remote(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
        .replace("//", "/")
}
