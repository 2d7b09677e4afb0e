//! Mirroring the local project to the remote working directory.
//!
//! Two remote round trips: `mkdir -p` over ssh, then `rsync --delete` from
//! `./` into the remote directory.

use crate::config::SessionConfig;
use crate::errors::SlurmError;
use crate::runner::{CommandRunner, Invocation};

/// Patterns that are never synced, ahead of any caller-supplied ones.
pub const DEFAULT_EXCLUDES: [&str; 7] = [
    ".git/",
    "__pycache__/",
    "*.pyc",
    ".DS_Store",
    ".vscode/",
    ".idea/",
    ".venv/",
];

/// Baseline patterns followed by `extra`, in order, duplicates kept.
pub fn build_excludes(extra: &[String]) -> Vec<String> {
    DEFAULT_EXCLUDES
        .iter()
        .map(|p| p.to_string())
        .chain(extra.iter().cloned())
        .collect()
}

/// Run `command` on the remote host: `ssh user@host <command>`.
pub fn ssh_invocation(session: &SessionConfig, command: impl Into<String>) -> Invocation {
    Invocation::new(&session.tools.ssh)
        .arg(session.target.to_string())
        .arg(command)
}

/// `mkdir -p` for the remote working directory. Idempotent on the remote side.
pub fn mkdir_invocation(session: &SessionConfig) -> Invocation {
    ssh_invocation(session, format!("mkdir -p {}", session.remote_dir_for_shell()))
}

/// `rsync -avz --delete --exclude <p>... ./ user@host:<remote_dir>`.
///
/// The `./` source copies the directory's contents rather than the directory.
pub fn rsync_invocation(session: &SessionConfig, excludes: &[String]) -> Invocation {
    let mut inv = Invocation::new(&session.tools.rsync).args(["-avz", "--delete"]);
    for pattern in excludes {
        inv = inv.arg("--exclude").arg(pattern);
    }
    inv.arg("./")
        .arg(format!("{}:{}", session.target, session.remote_dir))
}

/// Create the remote working directory, including intermediate segments.
pub fn ensure_remote_dir(
    runner: &dyn CommandRunner,
    session: &SessionConfig,
) -> Result<(), SlurmError> {
    let output = runner.run(&mkdir_invocation(session))?;
    if !output.is_success() {
        return Err(SlurmError::RemoteDirectory {
            stderr: output.stderr.trim_end().to_string(),
        });
    }
    Ok(())
}

/// Mirror the current directory into `session.remote_dir`.
///
/// Ensures the remote directory exists first. Remote files with no local
/// counterpart are deleted.
pub fn sync(
    runner: &dyn CommandRunner,
    session: &SessionConfig,
    extra_excludes: &[String],
) -> Result<(), SlurmError> {
    ensure_remote_dir(runner, session)?;

    let excludes = build_excludes(extra_excludes);
    tracing::debug!(count = excludes.len(), "exclusion patterns");

    let output = runner.run(&rsync_invocation(session, &excludes))?;
    if !output.is_success() {
        return Err(SlurmError::Sync {
            stderr: output.stderr.trim_end().to_string(),
        });
    }

    tracing::info!(
        "Code synced to {}:{}",
        session.target.host,
        session.remote_dir
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionTarget;
    use crate::runner::{CommandOutput, MockRunner};
    use crate::slurmssh_config::ToolCommands;

    fn session() -> SessionConfig {
        let target: ConnectionTarget = "testuser@test-cluster.example.com".parse().unwrap();
        SessionConfig::with_project_name(target, "test_job.slurm", "demo", "slurmssh")
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_build_excludes_baseline_then_extra() {
        let excludes = build_excludes(&strings(&["*.log", "data/"]));
        assert_eq!(excludes.len(), 9);
        assert_eq!(&excludes[..7], &DEFAULT_EXCLUDES.map(String::from)[..]);
        assert_eq!(&excludes[7..], &["*.log", "data/"]);
    }

    #[test]
    fn test_build_excludes_keeps_duplicates() {
        let excludes = build_excludes(&strings(&["__pycache__/"]));
        assert_eq!(excludes.len(), 8);
        assert_eq!(
            excludes.iter().filter(|p| *p == "__pycache__/").count(),
            2
        );
    }

    #[test]
    fn test_mkdir_invocation() {
        let inv = mkdir_invocation(&session());
        assert_eq!(inv.program, "ssh");
        assert_eq!(
            inv.args,
            vec![
                "testuser@test-cluster.example.com",
                "mkdir -p ~/slurmssh/demo/"
            ]
        );
    }

    #[test]
    fn test_mkdir_invocation_quotes_project_with_space() {
        let target: ConnectionTarget = "testuser@test-cluster.example.com".parse().unwrap();
        let s = SessionConfig::with_project_name(target, "job.slurm", "My Project", "slurmssh");
        assert_eq!(
            mkdir_invocation(&s).args[1],
            "mkdir -p ~/'slurmssh/My Project/'"
        );
    }

    #[test]
    fn test_rsync_invocation_layout() {
        let inv = rsync_invocation(&session(), &strings(&[".git/", "results/"]));
        assert_eq!(inv.program, "rsync");
        assert_eq!(
            inv.args,
            vec![
                "-avz",
                "--delete",
                "--exclude",
                ".git/",
                "--exclude",
                "results/",
                "./",
                "testuser@test-cluster.example.com:~/slurmssh/demo/",
            ]
        );
    }

    #[test]
    fn test_invocations_use_configured_tools() {
        let s = session().with_tools(ToolCommands {
            ssh: "/usr/bin/ssh".into(),
            rsync: "/opt/rsync".into(),
            sbatch: "sbatch".into(),
        });
        assert_eq!(mkdir_invocation(&s).program, "/usr/bin/ssh");
        assert_eq!(rsync_invocation(&s, &[]).program, "/opt/rsync");
    }

    #[test]
    fn test_sync_runs_mkdir_then_rsync() {
        let runner = MockRunner::new();
        sync(&runner, &session(), &strings(&["results/", "*.log"])).unwrap();

        let calls = runner.invocations();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], mkdir_invocation(&session()));

        let rsync = &calls[1];
        assert_eq!(rsync.program, "rsync");
        assert!(rsync.args.contains(&"results/".to_string()));
        assert!(rsync.args.contains(&"*.log".to_string()));
        let exclude_flags = rsync.args.iter().filter(|a| *a == "--exclude").count();
        assert_eq!(exclude_flags, 9);
    }

    #[test]
    fn test_sync_mkdir_failure_stops_before_rsync() {
        let runner =
            MockRunner::with_responses(vec![CommandOutput::failure(255, "Permission denied\n")]);
        let err = sync(&runner, &session(), &[]).unwrap_err();

        match &err {
            SlurmError::RemoteDirectory { stderr } => assert_eq!(stderr, "Permission denied"),
            other => panic!("Expected RemoteDirectory, got {other:?}"),
        }
        assert!(err.to_string().contains("Failed to create remote directory"));
        assert_eq!(runner.invocations().len(), 1);
    }

    #[test]
    fn test_sync_rsync_failure_carries_stderr() {
        let runner = MockRunner::with_responses(vec![
            CommandOutput::success(""),
            CommandOutput::failure(23, "rsync: connection unexpectedly closed"),
        ]);
        let err = sync(&runner, &session(), &[]).unwrap_err();

        match &err {
            SlurmError::Sync { stderr } => {
                assert!(stderr.contains("connection unexpectedly closed"))
            }
            other => panic!("Expected Sync, got {other:?}"),
        }
        assert!(err.to_string().starts_with("Failed to sync code"));
    }
}
