//! Sync a local project to a Slurm cluster over ssh and submit a batch job.
//!
//! The workflow is linear: resolve the project name, `mkdir -p` the remote
//! working directory, rsync the project into it, then run `sbatch` there and
//! parse the job id from its acknowledgement. See [`client::SlurmClient`].

pub mod client;
pub mod config;
pub mod errors;
pub mod project;
pub mod runner;
pub mod script;
pub mod slurmssh_config;
pub mod submit;
pub mod sync;
pub mod ui;
