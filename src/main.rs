use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cmd;

const EXAMPLES: &str = "\
Examples:
  slurmssh --ssh username@hostname script.slurm
  slurmssh --ssh user@cluster job.slurm --exclude \"data/\" \"*.log\"
  slurmssh --ssh user@cluster job.slurm -- --gres=gpu:v100:2 --mem=32G
  slurmssh --ssh user@cluster train.py -- --epochs 100";

#[derive(Parser)]
#[command(name = "slurmssh")]
#[command(version, about = "Sync code and submit jobs to a Slurm cluster")]
#[command(after_help = EXAMPLES)]
pub struct Cli {
    /// SSH connection string (username@hostname)
    #[arg(long, value_name = "USER@HOST")]
    pub ssh: String,

    /// Slurm job script (.slurm, .sbatch, .sh) or a plain script to wrap in one
    pub script: PathBuf,

    /// Additional patterns to exclude from rsync
    #[arg(long, num_args = 0.., value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Interpreter launcher for generated scripts: auto, uv, python. Overrides slurmssh.toml.
    #[arg(long)]
    pub launcher: Option<String>,

    /// Print the commands that would run without contacting the cluster
    #[arg(long)]
    pub dry_run: bool,

    /// Print a JSON submission report on stdout
    #[arg(long)]
    pub json: bool,

    /// Path to the config file
    #[arg(long, default_value = slurmssh::slurmssh_config::CONFIG_FILE)]
    pub config: PathBuf,

    #[arg(short, long)]
    pub verbose: bool,

    /// Arguments for sbatch (batch scripts) or for the script itself (plain scripts)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
    pub args: Vec<String>,
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "slurmssh=debug"
    } else {
        "slurmssh=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let project_dir = std::env::current_dir().context("Failed to get current directory")?;

    cmd::cmd_submit(
        &project_dir,
        cmd::SubmitArgs {
            ssh: cli.ssh,
            script: cli.script,
            exclude: cli.exclude,
            args: cli.args,
            launcher: cli.launcher,
            config: cli.config,
            dry_run: cli.dry_run,
            json: cli.json,
        },
    )
}
