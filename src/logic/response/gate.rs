//! Action Gate - turns a flagged verdict into at most one block attempt
//!
//! ```text
//! PENDING ─ not flagged ──────────────────────────────► NO_ACTION
//!         ─ flagged, mode NoAction ───────────────────► NO_ACTION
//!         ─ flagged, mode Simulate ───────────────────► SIMULATED
//!         ─ flagged, mode Live ─ OS != linux ─────────► UNSUPPORTED
//!                               ─ not an IP ──────────► FAILED
//!                               ─ exit 0 ─────────────► EXECUTED
//!                               ─ non-zero / error ───► FAILED
//! ```

use std::time::Duration;

use super::network::{self, BlockCommand};
use super::runner::{CommandRunner, SystemRunner};
use super::types::{ActionError, ActionMode, ActionRecord};

/// Knobs for live execution
#[derive(Debug, Clone, Copy)]
pub struct ExecOptions {
    pub timeout: Duration,
    pub use_sudo: bool,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(crate::constants::DEFAULT_ACTION_TIMEOUT_SECS),
            use_sudo: true,
        }
    }
}

pub struct ActionGate {
    mode: ActionMode,
    runner: Option<Box<dyn CommandRunner>>,
    options: ExecOptions,
}

impl ActionGate {
    /// Gate backed by real processes. A runtime is only built for `Live`.
    pub fn new(mode: ActionMode, options: ExecOptions) -> std::io::Result<Self> {
        let runner: Option<Box<dyn CommandRunner>> = match mode {
            ActionMode::Live => Some(Box::new(SystemRunner::new()?)),
            ActionMode::NoAction | ActionMode::Simulate => None,
        };
        Ok(Self { mode, runner, options })
    }

    /// Gate with an injected runner (tests, alternative executors)
    pub fn with_runner(mode: ActionMode, runner: Box<dyn CommandRunner>, options: ExecOptions) -> Self {
        Self { mode, runner: Some(runner), options }
    }

    pub fn simulate() -> Self {
        Self { mode: ActionMode::Simulate, runner: None, options: ExecOptions::default() }
    }

    pub fn mode(&self) -> ActionMode {
        self.mode
    }

    /// Decide and, in live mode, act for one host.
    pub fn decide(&self, host_id: &str, flagged: bool) -> ActionRecord {
        if !flagged {
            return ActionRecord::no_action("no action");
        }

        let command = BlockCommand::for_host(host_id);
        match self.mode {
            ActionMode::NoAction => ActionRecord::no_action("actions disabled"),
            ActionMode::Simulate => {
                log::info!("[dry-run] would run: {}", command);
                ActionRecord::simulated(command.to_string())
            }
            ActionMode::Live => self.execute(host_id, command),
        }
    }

    fn execute(&self, host_id: &str, command: BlockCommand) -> ActionRecord {
        let os = network::current_os();
        if !network::is_supported_os(os) {
            log::warn!("Live block for {} skipped: unsupported platform {}", host_id, os);
            return ActionRecord::unsupported(command.to_string(), os);
        }

        if network::parse_target(host_id).is_none() {
            let err = ActionError::InvalidTarget(host_id.to_string());
            log::error!("{}", err);
            return ActionRecord::failed(command.to_string(), &err);
        }

        let Some(runner) = self.runner.as_ref() else {
            return ActionRecord::failed(command.to_string(), &ActionError::NoRunner);
        };

        let argv = command.argv(self.options.use_sudo);
        match runner.run(&argv, self.options.timeout) {
            Ok(output) if output.success => {
                log::warn!("Blocked inbound traffic from {}", host_id);
                ActionRecord::executed(command.to_string(), &output)
            }
            Ok(output) => {
                let err = ActionError::CommandFailed {
                    command: argv.join(" "),
                    exit_code: output.exit_code,
                    stderr: output.stderr.trim().to_string(),
                };
                log::error!("Block for {} failed: {}", host_id, err);
                ActionRecord::failed(command.to_string(), &err)
            }
            Err(err) => {
                log::error!("Block for {} failed: {}", host_id, err);
                ActionRecord::failed(command.to_string(), &err)
            }
        }
    }
}
