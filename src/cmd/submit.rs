//! Sync-and-submit command, the default `slurmssh` invocation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use slurmssh::client::SlurmClient;
use slurmssh::config::{ConnectionTarget, SessionConfig};
use slurmssh::errors::ConfigError;
use slurmssh::project::ProjectContext;
use slurmssh::runner::{CommandRunner, ProcessRunner};
use slurmssh::script::{Launcher, generate_script, is_batch_script};
use slurmssh::slurmssh_config::SlurmSshToml;
use slurmssh::ui::SubmitUI;
use slurmssh::ui::icons::{FOLDER, PLAN, ROCKET, SCRIPT, SYNC};

/// Parsed CLI inputs for one submission.
pub struct SubmitArgs {
    pub ssh: String,
    pub script: PathBuf,
    pub exclude: Vec<String>,
    pub args: Vec<String>,
    pub launcher: Option<String>,
    pub config: PathBuf,
    pub dry_run: bool,
    pub json: bool,
}

/// Machine-readable result printed with `--json`.
#[derive(Debug, Serialize)]
struct SubmissionReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    job_id: Option<String>,
    host: String,
    username: String,
    project: String,
    remote_dir: String,
    launch_script: String,
    generated: bool,
    dry_run: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    commands: Vec<String>,
}

pub fn cmd_submit(project_dir: &Path, args: SubmitArgs) -> Result<()> {
    let ui = SubmitUI::new(args.json);

    // Local validation first: nothing below may touch the remote host on failure.
    let target: ConnectionTarget = args.ssh.parse()?;
    if !args.script.exists() {
        return Err(ConfigError::ScriptNotFound { path: args.script }.into());
    }

    let config_path = if args.config.is_absolute() {
        args.config.clone()
    } else {
        project_dir.join(&args.config)
    };
    let config = SlurmSshToml::load_or_default(&config_path)?;
    for warning in config.validate() {
        ui.warn(&warning);
    }

    let ctx = ProjectContext::discover(project_dir);

    let (launch_script, sbatch_args, generated) = if is_batch_script(&args.script) {
        (args.script.clone(), args.args.clone(), false)
    } else {
        let mut options = config.script.to_options();
        if let Some(launcher) = args.launcher.as_deref() {
            options.launcher = launcher.parse::<Launcher>()?;
        }
        let output_dir = args.script.parent().unwrap_or(Path::new(""));
        let path = generate_script(&args.script, &args.args, output_dir, &options, &ctx)
            .context("Failed to generate batch script")?;
        ui.print_line(format!(
            "{}Generated {} ({} launcher)",
            SCRIPT,
            path.display(),
            options.launcher.resolve(&ctx)
        ));
        (path, Vec::new(), true)
    };

    let session = SessionConfig::new(target, launch_script, &ctx, &config.remote.namespace)
        .with_tools(config.tools());
    tracing::debug!(
        project = %session.project_name,
        remote_dir = %session.remote_dir,
        "session resolved"
    );

    let mut excludes = config.sync.exclude.clone();
    excludes.extend(args.exclude.iter().cloned());

    let client = SlurmClient::new(session, ProcessRunner);
    let session = client.session();

    let mut report = SubmissionReport {
        job_id: None,
        host: session.target.host.clone(),
        username: session.target.username.clone(),
        project: session.project_name.clone(),
        remote_dir: session.remote_dir.clone(),
        launch_script: session.remote_script(),
        generated,
        dry_run: args.dry_run,
        commands: Vec::new(),
    };

    if args.dry_run {
        let plan: Vec<String> = client
            .plan(&excludes, &sbatch_args)
            .iter()
            .map(ToString::to_string)
            .collect();
        ui.print_line(format!(
            "{}Dry run: {}{}:{}",
            PLAN, FOLDER, session.target.host, session.remote_dir
        ));
        for line in &plan {
            ui.print_line(format!("  {}", line));
        }
        report.commands = plan;
    } else {
        run_steps(&client, &ui, &excludes, &sbatch_args, &mut report)?;
    }

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    }

    Ok(())
}

fn run_steps<R: CommandRunner>(
    client: &SlurmClient<R>,
    ui: &SubmitUI,
    excludes: &[String],
    sbatch_args: &[String],
    report: &mut SubmissionReport,
) -> Result<()> {
    let session = client.session();

    let step = ui.start_step(
        &SYNC,
        &format!("Syncing to {}:{}", session.target.host, session.remote_dir),
    );
    if let Err(e) = client.sync(excludes) {
        ui.step_failed(step, "Sync failed");
        return Err(e.into());
    }
    ui.step_done(
        step,
        &format!(
            "Code synced to {}:{}",
            session.target.host, session.remote_dir
        ),
    );

    let step = ui.start_step(
        &ROCKET,
        &format!("Submitting {}", session.launch_script_path.display()),
    );
    let job_id = match client.submit_job(sbatch_args) {
        Ok(id) => id,
        Err(e) => {
            ui.step_failed(step, "Submission failed");
            return Err(e.into());
        }
    };
    step.finish_and_clear();
    ui.job_submitted(job_id.as_str());

    report.job_id = Some(job_id.to_string());
    Ok(())
}
