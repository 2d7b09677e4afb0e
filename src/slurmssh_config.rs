//! Configuration file support for slurmssh.
//!
//! Settings are layered: built-in defaults, then `slurmssh.toml` in the
//! working directory, then environment variables, then CLI flags.
//!
//! # Configuration File Format
//!
//! ```toml
//! [remote]
//! namespace = "slurmssh"
//! ssh_cmd = "ssh"
//! rsync_cmd = "rsync"
//! sbatch_cmd = "sbatch"
//!
//! [sync]
//! exclude = ["data/", "*.ckpt"]
//!
//! [script]
//! launcher = "auto"
//! python = "python"
//! time = "01:00:00"
//! mem = "4G"
//! ntasks = 1
//! cpus_per_task = 1
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::script::{BatchScriptOptions, Launcher};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "slurmssh.toml";

/// Environment variables that override the tool commands.
pub const SSH_CMD_ENV: &str = "SLURMSSH_SSH_CMD";
pub const RSYNC_CMD_ENV: &str = "SLURMSSH_RSYNC_CMD";
pub const SBATCH_CMD_ENV: &str = "SLURMSSH_SBATCH_CMD";

/// Remote host and tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSection {
    /// Directory under the remote home that holds one subdirectory per project
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_cmd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsync_cmd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sbatch_cmd: Option<String>,
}

fn default_namespace() -> String {
    "slurmssh".to_string()
}

impl Default for RemoteSection {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            ssh_cmd: None,
            rsync_cmd: None,
            sbatch_cmd: None,
        }
    }
}

/// Extra rsync exclusions, applied after the built-in baseline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncSection {
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Defaults for generated batch scripts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptSection {
    #[serde(default)]
    pub launcher: Launcher,
    #[serde(default = "default_python")]
    pub python: String,
    #[serde(default = "default_time")]
    pub time: String,
    #[serde(default = "default_mem")]
    pub mem: String,
    #[serde(default = "default_ntasks")]
    pub ntasks: u32,
    #[serde(default = "default_cpus_per_task")]
    pub cpus_per_task: u32,
}

fn default_python() -> String {
    "python".to_string()
}

fn default_time() -> String {
    "01:00:00".to_string()
}

fn default_mem() -> String {
    "4G".to_string()
}

fn default_ntasks() -> u32 {
    1
}

fn default_cpus_per_task() -> u32 {
    1
}

impl Default for ScriptSection {
    fn default() -> Self {
        Self {
            launcher: Launcher::default(),
            python: default_python(),
            time: default_time(),
            mem: default_mem(),
            ntasks: default_ntasks(),
            cpus_per_task: default_cpus_per_task(),
        }
    }
}

impl ScriptSection {
    pub fn to_options(&self) -> BatchScriptOptions {
        BatchScriptOptions {
            launcher: self.launcher,
            python: self.python.clone(),
            time: self.time.clone(),
            mem: self.mem.clone(),
            ntasks: self.ntasks,
            cpus_per_task: self.cpus_per_task,
        }
    }
}

/// The complete `slurmssh.toml` structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlurmSshToml {
    #[serde(default)]
    pub remote: RemoteSection,
    #[serde(default)]
    pub sync: SyncSection,
    #[serde(default)]
    pub script: ScriptSection,
}

impl SlurmSshToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            source,
        })?;
        config.check()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise return the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn ssh_cmd(&self) -> String {
        resolve_cmd(SSH_CMD_ENV, self.remote.ssh_cmd.as_deref(), "ssh")
    }

    pub fn rsync_cmd(&self) -> String {
        resolve_cmd(RSYNC_CMD_ENV, self.remote.rsync_cmd.as_deref(), "rsync")
    }

    pub fn sbatch_cmd(&self) -> String {
        resolve_cmd(SBATCH_CMD_ENV, self.remote.sbatch_cmd.as_deref(), "sbatch")
    }

    pub fn tools(&self) -> ToolCommands {
        ToolCommands {
            ssh: self.ssh_cmd(),
            rsync: self.rsync_cmd(),
            sbatch: self.sbatch_cmd(),
        }
    }

    /// Reject settings no submission could succeed with.
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.script.ntasks == 0 {
            return Err(ConfigError::Invalid("script.ntasks must be at least 1".into()));
        }
        if self.script.cpus_per_task == 0 {
            return Err(ConfigError::Invalid(
                "script.cpus_per_task must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let namespace = &self.remote.namespace;
        if namespace.trim().is_empty() {
            warnings.push("remote.namespace is empty; projects will sync directly under ~/".into());
        } else if namespace.chars().any(char::is_whitespace) {
            warnings.push(format!(
                "remote.namespace '{}' contains whitespace, which the remote shell will split",
                namespace
            ));
        } else if namespace.starts_with('/') || namespace.ends_with('/') {
            warnings.push(format!(
                "remote.namespace '{}' should not start or end with '/'",
                namespace
            ));
        }

        for pattern in &self.sync.exclude {
            if pattern.trim().is_empty() {
                warnings.push("sync.exclude contains an empty pattern".into());
            }
        }

        warnings
    }
}

/// Environment variable first, then the file value, then the default.
fn resolve_cmd(env_key: &str, file_value: Option<&str>, default: &str) -> String {
    std::env::var(env_key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| file_value.map(str::to_string))
        .unwrap_or_else(|| default.to_string())
}

/// Program names for the three external tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommands {
    pub ssh: String,
    pub rsync: String,
    pub sbatch: String,
}

impl Default for ToolCommands {
    fn default() -> Self {
        Self {
            ssh: "ssh".to_string(),
            rsync: "rsync".to_string(),
            sbatch: "sbatch".to_string(),
        }
    }
}
