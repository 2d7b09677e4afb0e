//! The sync-then-submit workflow.

use crate::config::SessionConfig;
use crate::errors::SlurmError;
use crate::runner::{CommandRunner, Invocation};
use crate::submit::{JobId, submit_invocation, submit_job};
use crate::sync::{build_excludes, mkdir_invocation, rsync_invocation, sync};

/// Drives one submission: mkdir, rsync, sbatch, strictly in that order.
///
/// Each step blocks until the external command exits; the first failure
/// aborts the rest. Nothing is retried.
pub struct SlurmClient<R: CommandRunner> {
    session: SessionConfig,
    runner: R,
}

impl<R: CommandRunner> SlurmClient<R> {
    pub fn new(session: SessionConfig, runner: R) -> Self {
        Self { session, runner }
    }

    pub fn session(&self) -> &SessionConfig {
        &self.session
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Mirror the project to the remote working directory.
    pub fn sync(&self, excludes: &[String]) -> Result<(), SlurmError> {
        sync(&self.runner, &self.session, excludes)
    }

    /// Submit the launch script from the remote working directory.
    pub fn submit_job(&self, extra_args: &[String]) -> Result<JobId, SlurmError> {
        submit_job(&self.runner, &self.session, extra_args)
    }

    /// Sync, then submit.
    pub fn submit(&self, excludes: &[String], extra_args: &[String]) -> Result<JobId, SlurmError> {
        self.sync(excludes)?;
        self.submit_job(extra_args)
    }

    /// The invocations `submit` would run, in order, without running them.
    pub fn plan(&self, excludes: &[String], extra_args: &[String]) -> Vec<Invocation> {
        vec![
            mkdir_invocation(&self.session),
            rsync_invocation(&self.session, &build_excludes(excludes)),
            submit_invocation(&self.session, extra_args),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionTarget;
    use crate::errors::SubmissionError;
    use crate::runner::{CommandOutput, MockRunner};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn client(responses: Vec<CommandOutput>) -> SlurmClient<MockRunner> {
        let target: ConnectionTarget = "researcher@gpu-cluster.edu".parse().unwrap();
        let session = SessionConfig::with_project_name(target, "job.slurm", "vision", "slurmssh");
        SlurmClient::new(session, MockRunner::with_responses(responses))
    }

    #[test]
    fn test_gpu_submission_end_to_end() {
        let client = client(vec![
            CommandOutput::success(""),
            CommandOutput::success(""),
            CommandOutput::success("Submitted batch job 98765\n"),
        ]);
        let extra = strings(&["--gres=gpu:v100:2", "--mem=32G"]);

        let job_id = client.submit(&[], &extra).unwrap();
        assert_eq!(job_id.as_str(), "98765");

        let calls = client.runner().invocations();
        assert_eq!(calls.len(), 3);
        let command = &calls[2].args[1];
        let script_pos = command.find("job.slurm").unwrap();
        assert!(command.find("--gres=gpu:v100:2").unwrap() < script_pos);
        assert!(command.find("--mem=32G").unwrap() < script_pos);
        assert_eq!(calls[2].args[0], "researcher@gpu-cluster.edu");
    }

    #[test]
    fn test_array_job_scenario() {
        let client = client(vec![
            CommandOutput::success(""),
            CommandOutput::success(""),
            CommandOutput::success("Submitted batch job 55555\n"),
        ]);
        let excludes = strings(&["results/", "*.log", "__pycache__/"]);
        let extra = strings(&["--array=1-100", "--time=01:00:00"]);

        client.submit(&excludes, &extra).unwrap();

        let calls = client.runner().invocations();
        let rsync_args = &calls[1].args;
        assert!(rsync_args.contains(&"--exclude".to_string()));
        assert!(rsync_args.contains(&"results/".to_string()));
        assert!(rsync_args.contains(&"*.log".to_string()));
        assert!(calls[2].args[1].contains("--array=1-100"));
    }

    #[test]
    fn test_sync_failure_skips_submission() {
        let client = client(vec![
            CommandOutput::success(""),
            CommandOutput::failure(12, "rsync error: error in rsync protocol data stream"),
        ]);
        let err = client.submit(&[], &[]).unwrap_err();
        assert!(matches!(err, SlurmError::Sync { .. }));
        assert_eq!(client.runner().invocations().len(), 2);
    }

    #[test]
    fn test_submission_error_surfaces_from_workflow() {
        let client = client(vec![
            CommandOutput::success(""),
            CommandOutput::success(""),
            CommandOutput::failure(1, "sbatch: error: Batch job submission failed"),
        ]);
        let err = client.submit(&[], &[]).unwrap_err();
        assert!(matches!(
            err,
            SlurmError::Submission(SubmissionError::Failed { .. })
        ));
    }

    #[test]
    fn test_plan_matches_executed_invocations() {
        let client = client(vec![
            CommandOutput::success(""),
            CommandOutput::success(""),
            CommandOutput::success("Submitted batch job 1\n"),
        ]);
        let excludes = strings(&["data/"]);
        let extra = strings(&["--nodes=2"]);

        let plan = client.plan(&excludes, &extra);
        client.submit(&excludes, &extra).unwrap();
        assert_eq!(plan, client.runner().invocations());
    }
}
