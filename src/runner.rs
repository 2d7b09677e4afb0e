//! External command execution.
//!
//! Drivers never spawn processes themselves. They build an `Invocation` and
//! hand it to a `CommandRunner`:
//! - `ProcessRunner` is the production runner, backed by `std::process::Command`
//! - `MockRunner` records invocations and replays canned outputs for tests

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::process::{Command, Stdio};

use crate::errors::SlurmError;

/// A fully built external command that has not been run yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

/// Renders the invocation the way a user would type it, single-quoting any
/// argument that the local shell would otherwise split or expand.
impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(arg))?;
        }
        Ok(())
    }
}

/// True if a POSIX shell would split, glob or expand `arg`.
pub fn needs_quoting(arg: &str) -> bool {
    arg.is_empty()
        || arg
            .chars()
            .any(|c| c.is_whitespace() || "*?$&;|<>()'\"`\\!{}[]".contains(c))
}

/// Single-quote `arg` if needed. Nothing inside is expanded.
pub fn shell_quote(arg: &str) -> String {
    if needs_quoting(arg) {
        format!("'{}'", arg.replace('\'', r"'\''"))
    } else {
        arg.to_string()
    }
}

/// Double-quote `arg` if needed. `$VARS` inside still expand; backslashes,
/// double quotes and backticks are escaped.
pub fn double_quote(arg: &str) -> String {
    if !needs_quoting(arg) {
        return arg.to_string();
    }
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    for c in arg.chars() {
        if matches!(c, '\\' | '"' | '`') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Exit code and captured output of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Executes invocations and reports their exit code and output.
///
/// A non-zero exit is *not* an error at this layer; callers inspect
/// `CommandOutput::exit_code`. `Err` means the program could not be run at all.
pub trait CommandRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, SlurmError>;
}

/// Production runner. Blocks until the child exits.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, SlurmError> {
        tracing::debug!(command = %invocation, "running");

        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| SlurmError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        // Killed by a signal: no exit code.
        let exit_code = output.status.code().unwrap_or(-1);
        tracing::debug!(program = %invocation.program, exit_code, "finished");

        Ok(CommandOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Test double that records invocations and returns preset outputs in order.
///
/// Once the preset outputs run out every further call succeeds with empty output.
#[derive(Debug, Default)]
pub struct MockRunner {
    responses: RefCell<VecDeque<CommandOutput>>,
    invocations: RefCell<Vec<Invocation>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses(responses: Vec<CommandOutput>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            invocations: RefCell::new(Vec::new()),
        }
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.borrow().clone()
    }

    /// The last recorded invocation, if any.
    pub fn last(&self) -> Option<Invocation> {
        self.invocations.borrow().last().cloned()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, SlurmError> {
        self.invocations.borrow_mut().push(invocation.clone());
        Ok(self
            .responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| CommandOutput::success("")))
    }
}
