//! Typed error hierarchy for slurmssh.
//!
//! Three enums cover the failure surface:
//! - `ConfigError` — local problems detected before any remote call
//! - `SubmissionError` — `sbatch` failed or its acknowledgement was unreadable
//! - `SlurmError` — everything a workflow step can return, wrapping the two above

use std::path::PathBuf;

use thiserror::Error;

/// Local configuration errors. None of these touch remote state.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("SSH connection must be in format username@hostname, got '{value}'")]
    InvalidConnection { value: String },

    #[error("Script file '{}' not found", path.display())]
    ScriptNotFound { path: PathBuf },

    #[error("Failed to read config file at {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {}: {source}", path.display())]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors from the `sbatch` round trip.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("Failed to submit job: {stderr}")]
    Failed { stderr: String },

    #[error("Unexpected sbatch output: {stdout}")]
    UnexpectedOutput { stdout: String },
}

/// Errors from any step of the sync-then-submit workflow.
#[derive(Debug, Error)]
pub enum SlurmError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to create remote directory: {stderr}")]
    RemoteDirectory { stderr: String },

    #[error("Failed to sync code: {stderr}")]
    Sync { stderr: String },

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error("Failed to execute '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write batch script at {}: {source}", path.display())]
    ScriptWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
