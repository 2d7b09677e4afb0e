//! Project identity and manifest inspection.
//!
//! Everything here is a pure function of a `ProjectContext`, which is gathered
//! from the filesystem exactly once by `ProjectContext::discover`.

use std::path::{Component, Path};

/// Python project manifest consulted for the project name and tool sections.
pub const MANIFEST_FILE: &str = "pyproject.toml";

/// Lock file whose presence marks a uv-managed project.
pub const UV_LOCK_FILE: &str = "uv.lock";

/// Ambient inputs for project name resolution and launcher detection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectContext {
    /// Raw `pyproject.toml` contents, if the file could be read.
    pub manifest: Option<String>,
    /// Whether `uv.lock` exists in the working directory.
    pub uv_lock: bool,
    /// Base name of the working directory.
    pub cwd_name: String,
}

impl ProjectContext {
    /// Gather the context from `dir`. Never fails: unreadable files are
    /// treated as absent.
    pub fn discover(dir: &Path) -> Self {
        let manifest_path = dir.join(MANIFEST_FILE);
        let manifest = match std::fs::read_to_string(&manifest_path) {
            Ok(content) => Some(content),
            Err(e) => {
                if manifest_path.exists() {
                    tracing::debug!(path = %manifest_path.display(), error = %e, "ignoring unreadable manifest");
                }
                None
            }
        };

        // `canonicalize` resolves a relative `dir` such as "." to a named directory.
        let cwd_name = dir
            .canonicalize()
            .ok()
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            manifest,
            uv_lock: dir.join(UV_LOCK_FILE).exists(),
            cwd_name,
        }
    }

    pub fn manifest_table(&self) -> Option<toml::Table> {
        parse_manifest(self.manifest.as_deref()?)
    }
}

/// Parse manifest text, treating any syntax error as "no manifest".
pub fn parse_manifest(content: &str) -> Option<toml::Table> {
    match toml::from_str::<toml::Table>(content) {
        Ok(table) => Some(table),
        Err(e) => {
            tracing::debug!(error = %e, "ignoring unparseable manifest");
            None
        }
    }
}

/// The `[project] name` declared in the manifest, if it is a string.
pub fn manifest_project_name(manifest: &toml::Table) -> Option<&str> {
    manifest.get("project")?.get("name")?.as_str()
}

/// Whether the manifest declares a `[tool.<name>]` table.
pub fn manifest_has_tool(manifest: &toml::Table, name: &str) -> bool {
    manifest
        .get("tool")
        .and_then(|tool| tool.get(name))
        .is_some_and(toml::Value::is_table)
}

/// Resolve the name that namespaces the remote working directory.
///
/// First match wins:
/// 1. `project.name` from the manifest text
/// 2. the launch script's parent directory name, unless that parent is the
///    current directory
/// 3. `cwd_name`
pub fn resolve_project_name(
    manifest: Option<&str>,
    launch_script_path: &Path,
    cwd_name: &str,
) -> String {
    if let Some(table) = manifest.and_then(parse_manifest)
        && let Some(name) = manifest_project_name(&table)
        && !name.trim().is_empty()
    {
        return name.to_string();
    }

    if let Some(parent) = launch_script_path.parent()
        && !is_current_dir(parent)
        && let Some(name) = parent.file_name()
    {
        return name.to_string_lossy().into_owned();
    }

    cwd_name.to_string()
}

fn is_current_dir(path: &Path) -> bool {
    path.components().all(|c| matches!(c, Component::CurDir))
}

/// Remote working directory for a project: `~/<namespace>/<project_name>/`.
///
/// The trailing slash makes rsync treat the destination as a directory.
pub fn remote_dir(namespace: &str, project_name: &str) -> String {
    format!("~/{}/{}/", namespace, project_name)
}
