//! External command execution
//!
//! The control-plane adapters never spawn processes directly; they go through
//! a [`CommandRunner`] so tests can script the tool output.

use std::io::{self, Write};
use std::process::{Command, Output, Stdio};

use tracing::debug;

/// Captured result of one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Runs an external program to completion.
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`, feeding `stdin` if given.
    ///
    /// Only failures to start or talk to the process are `Err`; a non-zero
    /// exit is reported through [`CommandOutput::success`].
    fn run(&self, program: &str, args: &[String], stdin: Option<&str>)
        -> io::Result<CommandOutput>;
}

/// Runs commands on the local machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        stdin: Option<&str>,
    ) -> io::Result<CommandOutput> {
        debug!(program, ?args, "Running command");

        let mut child = Command::new(program)
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes())?;
            // Dropping the pipe closes stdin so the child sees EOF.
        }

        Ok(child.wait_with_output()?.into())
    }
}
