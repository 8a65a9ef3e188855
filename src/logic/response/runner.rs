//! Command Runner - the only place a child process is spawned
//!
//! Each call runs at most once: no retry on failure or timeout.

use std::time::Duration;

use tokio::process::Command;
use tokio::runtime::Runtime;

use super::types::{ActionError, CommandOutput};

pub trait CommandRunner {
    /// Run `argv[0]` with the remaining args, bounded by `timeout`.
    fn run(&self, argv: &[String], timeout: Duration) -> Result<CommandOutput, ActionError>;
}

/// Runs real processes on a private current-thread runtime
pub struct SystemRunner {
    runtime: Runtime,
}

impl SystemRunner {
    pub fn new() -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self { runtime })
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, argv: &[String], timeout: Duration) -> Result<CommandOutput, ActionError> {
        let command_line = argv.join(" ");
        let (program, args) = argv.split_first().ok_or_else(|| ActionError::Spawn {
            command: command_line.clone(),
            message: "empty command".to_string(),
        })?;

        let result = self.runtime.block_on(async {
            let child = Command::new(program)
                .args(args)
                .kill_on_drop(true)
                .output();
            tokio::time::timeout(timeout, child).await
        });

        let output = match result {
            Err(_) => {
                return Err(ActionError::Timeout { command: command_line, timeout });
            }
            Ok(Err(e)) => {
                return Err(ActionError::Spawn { command: command_line, message: e.to_string() });
            }
            Ok(Ok(output)) => output,
        };

        Ok(CommandOutput {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
