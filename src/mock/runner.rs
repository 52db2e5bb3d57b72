//! Scripted command runner

use std::collections::VecDeque;
use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::host::{CommandOutput, CommandRunner};

/// One invocation seen by a [`ScriptedRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCommand {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<String>,
}

#[derive(Debug)]
enum Scripted {
    Output(CommandOutput),
    SpawnError(String),
}

/// Replays queued outputs in order and records every invocation. Once the
/// queue is empty every command succeeds with no output.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    queue: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<RecordedCommand>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, output: CommandOutput) {
        lock(&self.queue).push_back(Scripted::Output(output));
    }

    /// Make the next command fail to start.
    pub fn push_spawn_error(&self, message: impl Into<String>) {
        lock(&self.queue).push_back(Scripted::SpawnError(message.into()));
    }

    pub fn calls(&self) -> Vec<RecordedCommand> {
        lock(&self.calls).clone()
    }

    pub fn last_call(&self) -> Option<RecordedCommand> {
        lock(&self.calls).last().cloned()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[String], stdin: Option<&str>) -> io::Result<CommandOutput> {
        lock(&self.calls).push(RecordedCommand {
            program: program.to_string(),
            args: args.to_vec(),
            stdin: stdin.map(str::to_string),
        });

        match lock(&self.queue).pop_front() {
            Some(Scripted::Output(output)) => Ok(output),
            Some(Scripted::SpawnError(message)) => {
                Err(io::Error::new(io::ErrorKind::NotFound, message))
            }
            None => Ok(CommandOutput::ok("")),
        }
    }
}
