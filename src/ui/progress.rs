use crate::ui::icons::{CHECK, CROSS, WARN};
use console::style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Terminal UI for a single submission, rendered via `indicatif` spinners.
///
/// Each blocking step (mkdir, rsync, sbatch) gets its own spinner that ticks
/// while the external command runs and is replaced by a check or cross line
/// when the step finishes.
///
/// In quiet mode (`--json`) nothing is drawn and nothing is printed to
/// stdout, so stdout carries only the machine-readable report.
pub struct SubmitUI {
    quiet: bool,
}

impl SubmitUI {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Print a status line on stdout unless quiet.
    pub fn print_line(&self, msg: impl AsRef<str>) {
        if !self.quiet {
            println!("{}", msg.as_ref());
        }
    }

    /// Start a spinner for a blocking step.
    ///
    /// The spinner draws on stderr and is hidden when stderr is not a terminal.
    pub fn start_step(&self, emoji: impl std::fmt::Display, msg: &str) -> ProgressBar {
        let spinner = if self.quiet {
            ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden())
        } else {
            ProgressBar::new_spinner()
        };
        let spinner_style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg} {elapsed:.dim}")
            .expect("progress bar template is a valid static string");
        spinner.set_style(spinner_style);
        spinner.set_message(format!("{}{}", emoji, msg));
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    }

    /// Stop the step's spinner and print a success line.
    pub fn step_done(&self, step: ProgressBar, msg: &str) {
        step.finish_and_clear();
        self.print_line(format!("{}{}", CHECK, msg));
    }

    /// Stop the step's spinner and print a failure line on stderr.
    ///
    /// The full error is reported by `main`; this line only marks which step broke.
    pub fn step_failed(&self, step: ProgressBar, msg: &str) {
        step.finish_and_clear();
        if !self.quiet {
            eprintln!("{}{}", CROSS, style(msg).red());
        }
    }

    /// Print a configuration warning on stderr, even in quiet mode.
    pub fn warn(&self, msg: &str) {
        eprintln!("{}{}", WARN, style(msg).yellow());
    }

    /// Print the final job id line.
    pub fn job_submitted(&self, job_id: &str) {
        self.print_line(format!(
            "{}Job submitted with ID: {}",
            CHECK,
            style(job_id).green().bold()
        ));
    }
}
