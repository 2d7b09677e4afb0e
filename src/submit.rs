//! Remote `sbatch` submission and acknowledgement parsing.

use std::fmt;

use serde::Serialize;

use crate::config::SessionConfig;
use crate::errors::{SlurmError, SubmissionError};
use crate::runner::{CommandRunner, Invocation};
use crate::sync::ssh_invocation;

/// Phrase `sbatch` prints on a successful submission.
pub const ACK_MARKER: &str = "Submitted batch job";

/// Opaque job identifier assigned by the workload manager.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The remote shell command: `cd <remote_dir> && sbatch <extra_args...> <script>`.
///
/// `extra_args` go between `sbatch` and the script path, so they are read as
/// sbatch options. Arguments are joined verbatim; the remote shell expands
/// `~` and any `$VARS` they contain. The directory is quoted.
pub fn submit_command(session: &SessionConfig, extra_args: &[String]) -> String {
    let mut parts = vec![session.tools.sbatch.clone()];
    parts.extend(extra_args.iter().cloned());
    parts.push(session.remote_script());
    format!("cd {} && {}", session.remote_dir_for_shell(), parts.join(" "))
}

pub fn submit_invocation(session: &SessionConfig, extra_args: &[String]) -> Invocation {
    ssh_invocation(session, submit_command(session, extra_args))
}

/// Extract the job id from `sbatch` stdout.
///
/// The id is the last whitespace-delimited token of the trimmed output,
/// provided the output contains [`ACK_MARKER`] and something follows it.
pub fn parse_job_id(stdout: &str) -> Result<JobId, SubmissionError> {
    let output = stdout.trim();
    let unexpected = || SubmissionError::UnexpectedOutput {
        stdout: output.to_string(),
    };
    let (_, after) = output.rsplit_once(ACK_MARKER).ok_or_else(unexpected)?;
    if after.trim().is_empty() {
        return Err(unexpected());
    }
    output
        .split_whitespace()
        .last()
        .map(JobId::new)
        .ok_or_else(unexpected)
}

/// Submit the session's launch script and return the assigned job id.
pub fn submit_job(
    runner: &dyn CommandRunner,
    session: &SessionConfig,
    extra_args: &[String],
) -> Result<JobId, SlurmError> {
    let output = runner.run(&submit_invocation(session, extra_args))?;
    if !output.is_success() {
        return Err(SubmissionError::Failed {
            stderr: output.stderr.trim_end().to_string(),
        }
        .into());
    }

    let job_id = parse_job_id(&output.stdout)?;
    tracing::info!("Job submitted with ID: {}", job_id);
    Ok(job_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionTarget;
    use crate::runner::{CommandOutput, MockRunner};

    fn session(script: &str) -> SessionConfig {
        let target: ConnectionTarget = "testuser@test-cluster.example.com".parse().unwrap();
        SessionConfig::with_project_name(target, script, "demo", "slurmssh")
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_job_id_strips_whitespace() {
        assert_eq!(
            parse_job_id("Submitted batch job 12345\n").unwrap(),
            JobId::new("12345")
        );
        assert_eq!(
            parse_job_id("  Submitted batch job 777  \n\n").unwrap().as_str(),
            "777"
        );
    }

    #[test]
    fn test_parse_job_id_after_warning_lines() {
        let out = "sbatch: warning: partition defaulted\nSubmitted batch job 31337\n";
        assert_eq!(parse_job_id(out).unwrap().as_str(), "31337");
    }

    #[test]
    fn test_parse_job_id_unexpected_output() {
        let err = parse_job_id("Unexpected output format\n").unwrap_err();
        match &err {
            SubmissionError::UnexpectedOutput { stdout } => {
                assert_eq!(stdout, "Unexpected output format")
            }
            other => panic!("Expected UnexpectedOutput, got {other:?}"),
        }
        assert!(err.to_string().contains("Unexpected output format"));
    }

    #[test]
    fn test_parse_job_id_marker_without_id() {
        for out in ["Submitted batch job\n", "Submitted batch job   "] {
            match parse_job_id(out).unwrap_err() {
                SubmissionError::UnexpectedOutput { stdout } => {
                    assert_eq!(stdout, "Submitted batch job")
                }
                other => panic!("Expected UnexpectedOutput, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_submit_command_quotes_directory_with_space() {
        let target: ConnectionTarget = "testuser@test-cluster.example.com".parse().unwrap();
        let s = SessionConfig::with_project_name(target, "job.slurm", "My Project", "slurmssh");
        assert_eq!(
            submit_command(&s, &strings(&["--mem=8G"])),
            "cd ~/'slurmssh/My Project/' && sbatch --mem=8G job.slurm"
        );
    }

    #[test]
    fn test_submit_command_without_args() {
        assert_eq!(
            submit_command(&session("test_job.slurm"), &[]),
            "cd ~/slurmssh/demo/ && sbatch test_job.slurm"
        );
    }

    #[test]
    fn test_submit_command_places_args_before_script() {
        let cmd = submit_command(
            &session("test_job.slurm"),
            &strings(&["--time=10:00", "--mem=4G"]),
        );
        assert_eq!(
            cmd,
            "cd ~/slurmssh/demo/ && sbatch --time=10:00 --mem=4G test_job.slurm"
        );
    }

    #[test]
    fn test_submit_command_keeps_shell_variables_verbatim() {
        let cmd = submit_command(
            &session("array.slurm"),
            &strings(&["--array=1-100", "--output=out_${SLURM_ARRAY_TASK_ID}.txt"]),
        );
        assert!(cmd.contains("--array=1-100"));
        assert!(cmd.contains("out_${SLURM_ARRAY_TASK_ID}.txt"));
    }

    #[test]
    fn test_submit_job_success() {
        let runner =
            MockRunner::with_responses(vec![CommandOutput::success("Submitted batch job 12345\n")]);
        let s = session("test_job.slurm");
        let id = submit_job(&runner, &s, &[]).unwrap();

        assert_eq!(id.as_str(), "12345");
        let call = runner.last().unwrap();
        assert_eq!(call.program, "ssh");
        assert_eq!(
            call.args,
            vec![
                "testuser@test-cluster.example.com",
                "cd ~/slurmssh/demo/ && sbatch test_job.slurm"
            ]
        );
    }

    #[test]
    fn test_submit_job_failure_carries_stderr() {
        let runner = MockRunner::with_responses(vec![CommandOutput::failure(
            1,
            "sbatch: error: Invalid partition name",
        )]);
        let err = submit_job(
            &runner,
            &session("test_job.slurm"),
            &strings(&["--partition=invalid"]),
        )
        .unwrap_err();

        match &err {
            SlurmError::Submission(SubmissionError::Failed { stderr }) => {
                assert_eq!(stderr, "sbatch: error: Invalid partition name")
            }
            other => panic!("Expected Submission(Failed), got {other:?}"),
        }
        assert!(err.to_string().contains("Failed to submit job"));
    }

    #[test]
    fn test_submit_job_unexpected_output_is_error_despite_zero_exit() {
        let runner =
            MockRunner::with_responses(vec![CommandOutput::success("Unexpected output format\n")]);
        let err = submit_job(&runner, &session("test_job.slurm"), &[]).unwrap_err();
        assert!(matches!(
            err,
            SlurmError::Submission(SubmissionError::UnexpectedOutput { .. })
        ));
        assert!(err.to_string().contains("Unexpected sbatch output"));
    }

    #[test]
    fn test_job_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&JobId::new("98765")).unwrap();
        assert_eq!(json, "\"98765\"");
    }
}
