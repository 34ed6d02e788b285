//! Shell command execution

use anyhow::{anyhow, Context, Result};
use crossbeam::channel::{self, Sender};
use parking_lot::Mutex;
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

use super::ConsoleCommandAction;

/// Placeholder replaced by the binding's value before running a command
pub const VALUE_TOKEN: &str = "{V}";

/// Replace every [`VALUE_TOKEN`] in `command` with `value`.
///
/// Whole numbers print without a fraction (`1`, `64`), others as-is (`0.5`).
pub fn substitute_value(command: &str, value: f32) -> String {
    command.replace(VALUE_TOKEN, &value.to_string())
}

/// Runs commands through the platform shell, one at a time, in the order
/// they were dispatched.
///
/// Commands are queued to a single worker thread so dispatch never waits on
/// a child process. The worker is started by the first command and exits
/// when the `ShellCommand` is dropped.
#[derive(Debug, Default)]
pub struct ShellCommand {
    worker: Mutex<Option<Sender<String>>>,
}

impl ShellCommand {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(windows)]
    fn shell(command_line: &str) -> Command {
        let mut command = Command::new("cmd");
        command.arg("/C").arg(command_line);
        command
    }

    #[cfg(not(windows))]
    fn shell(command_line: &str) -> Command {
        let mut command = Command::new("sh");
        command.arg("-c").arg(command_line);
        command
    }

    fn spawn_worker() -> Result<Sender<String>> {
        let (sender, receiver) = channel::unbounded::<String>();
        std::thread::Builder::new()
            .name("console-command".to_string())
            .spawn(move || {
                for command_line in receiver {
                    Self::run(&command_line);
                }
                debug!("Console command worker stopped");
            })
            .context("Failed to spawn console command worker")?;
        Ok(sender)
    }

    /// Run one command line to completion, logging the outcome.
    fn run(command_line: &str) {
        info!("Running console command: {}", command_line);
        match Self::shell(command_line).stdin(Stdio::null()).status() {
            Ok(status) if status.success() => debug!("Console command finished: {}", status),
            Ok(status) => warn!("Console command '{}' exited with {}", command_line, status),
            Err(e) => warn!("Failed to run console command '{}': {}", command_line, e),
        }
    }
}

impl ConsoleCommandAction for ShellCommand {
    fn execute(&self, command: &str, value: f32) -> Result<()> {
        let command_line = substitute_value(command, value);
        if command_line.trim().is_empty() {
            debug!("Empty console command, nothing to run");
            return Ok(());
        }

        let mut worker = self.worker.lock();
        let sender = match worker.take() {
            Some(sender) => sender,
            None => Self::spawn_worker()?,
        };
        // A dead worker is not put back; the next command starts a new one
        sender
            .send(command_line)
            .map_err(|e| anyhow!("Console command worker is gone, dropped: {}", e.0))?;
        *worker = Some(sender);
        Ok(())
    }
}
