//! Batch script generation for plain interpreted scripts.
//!
//! A `.py` file handed to slurmssh gets a sibling `<stem>.slurm` with a
//! minimal set of `#SBATCH` directives and a single command line that runs it.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::path_for_remote;
use crate::errors::SlurmError;
use crate::project::{ProjectContext, manifest_has_tool};
use crate::runner::double_quote;

/// File extensions that are submitted as-is instead of being wrapped.
pub const BATCH_EXTENSIONS: [&str; 3] = ["slurm", "sbatch", "sh"];

/// Extension of generated batch scripts.
pub const GENERATED_EXTENSION: &str = "slurm";

/// Whether `path` is already a batch file, judged by extension.
pub fn is_batch_script(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| BATCH_EXTENSIONS.iter().any(|b| ext.eq_ignore_ascii_case(b)))
}

/// How the generated script invokes the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Launcher {
    /// Use uv when the project looks uv-managed, the bare interpreter otherwise
    #[default]
    Auto,
    /// `uv run python <script>`
    Uv,
    /// `<python> <script>`
    Python,
}

impl std::fmt::Display for Launcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Launcher::Auto => write!(f, "auto"),
            Launcher::Uv => write!(f, "uv"),
            Launcher::Python => write!(f, "python"),
        }
    }
}

impl std::str::FromStr for Launcher {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Launcher::Auto),
            "uv" => Ok(Launcher::Uv),
            "python" => Ok(Launcher::Python),
            _ => anyhow::bail!("Invalid launcher '{}'. Valid values: auto, uv, python", s),
        }
    }
}

impl Launcher {
    /// Collapse `Auto` into a concrete launcher using the project context.
    pub fn resolve(self, ctx: &ProjectContext) -> Launcher {
        match self {
            Launcher::Auto if uses_uv(ctx) => Launcher::Uv,
            Launcher::Auto => Launcher::Python,
            other => other,
        }
    }
}

/// Best-effort uv detection: a `uv.lock` file or a `[tool.uv]` table.
pub fn uses_uv(ctx: &ProjectContext) -> bool {
    ctx.uv_lock
        || ctx
            .manifest_table()
            .is_some_and(|table| manifest_has_tool(&table, "uv"))
}

/// Resource requests and interpreter settings for a generated script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchScriptOptions {
    pub launcher: Launcher,
    pub python: String,
    pub time: String,
    pub mem: String,
    pub ntasks: u32,
    pub cpus_per_task: u32,
}

impl Default for BatchScriptOptions {
    fn default() -> Self {
        Self {
            launcher: Launcher::Auto,
            python: "python".to_string(),
            time: "01:00:00".to_string(),
            mem: "4G".to_string(),
            ntasks: 1,
            cpus_per_task: 1,
        }
    }
}

impl BatchScriptOptions {
    fn interpreter(&self, ctx: &ProjectContext) -> String {
        match self.launcher.resolve(ctx) {
            Launcher::Uv => "uv run python".to_string(),
            _ => self.python.clone(),
        }
    }
}

/// Job name for a script: its file stem.
pub fn job_name(script_path: &Path) -> String {
    script_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "job".to_string())
}

/// Render the batch script text. Pure: identical inputs give identical output.
pub fn render_script(
    script_path: &Path,
    script_args: &[String],
    options: &BatchScriptOptions,
    ctx: &ProjectContext,
) -> String {
    let name = job_name(script_path);

    let mut command = format!("{} {}", options.interpreter(ctx), path_for_remote(script_path));
    for arg in script_args {
        command.push(' ');
        command.push_str(&double_quote(arg));
    }

    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(out, "#!/bin/bash");
    let _ = writeln!(out, "#SBATCH --job-name={}", name);
    let _ = writeln!(out, "#SBATCH --output={}_%j.out", name);
    let _ = writeln!(out, "#SBATCH --error={}_%j.err", name);
    let _ = writeln!(out, "#SBATCH --time={}", options.time);
    let _ = writeln!(out, "#SBATCH --ntasks={}", options.ntasks);
    let _ = writeln!(out, "#SBATCH --cpus-per-task={}", options.cpus_per_task);
    let _ = writeln!(out, "#SBATCH --mem={}", options.mem);
    let _ = writeln!(out);
    let _ = writeln!(out, "echo \"Job ID: $SLURM_JOB_ID\"");
    let _ = writeln!(out, "echo \"Job name: $SLURM_JOB_NAME\"");
    let _ = writeln!(out, "echo \"Node list: $SLURM_JOB_NODELIST\"");
    let _ = writeln!(out, "echo \"Start time: $(date)\"");
    let _ = writeln!(out, "echo \"Working directory: $(pwd)\"");
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", command);
    let _ = writeln!(out);
    let _ = writeln!(out, "echo \"End time: $(date)\"");
    out
}

/// Write `<output_dir>/<stem>.slurm` for `script_path`, overwriting any
/// existing file, and return its path.
pub fn generate_script(
    script_path: &Path,
    script_args: &[String],
    output_dir: &Path,
    options: &BatchScriptOptions,
    ctx: &ProjectContext,
) -> Result<PathBuf, SlurmError> {
    let content = render_script(script_path, script_args, options, ctx);
    let output_path = output_dir.join(format!("{}.{}", job_name(script_path), GENERATED_EXTENSION));

    if !output_dir.as_os_str().is_empty() && !output_dir.exists() {
        std::fs::create_dir_all(output_dir).map_err(|source| SlurmError::ScriptWrite {
            path: output_path.clone(),
            source,
        })?;
    }
    std::fs::write(&output_path, content).map_err(|source| SlurmError::ScriptWrite {
        path: output_path.clone(),
        source,
    })?;

    tracing::info!(path = %output_path.display(), "generated batch script");
    Ok(output_path)
}
