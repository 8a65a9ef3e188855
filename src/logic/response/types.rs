//! Response Types

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// ACTION MODE
// ============================================================================

/// What the gate may do with a flagged host. One value, three states: there
/// is no combination of switches that can mean "simulate" and "live" at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionMode {
    /// Record nothing beyond the verdict
    #[serde(alias = "none")]
    NoAction,
    /// Build and log the command, never run it
    #[default]
    Simulate,
    /// Attempt the firewall change
    Live,
}

impl ActionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionMode::NoAction => "no_action",
            ActionMode::Simulate => "simulate",
            ActionMode::Live => "live",
        }
    }
}

impl std::str::FromStr for ActionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "no_action" => Ok(ActionMode::NoAction),
            "simulate" | "dry-run" => Ok(ActionMode::Simulate),
            "live" => Ok(ActionMode::Live),
            other => Err(format!("unknown action mode '{}' (expected none, simulate or live)", other)),
        }
    }
}

// ============================================================================
// ACTION RECORD
// ============================================================================

/// Terminal state of one host's gate pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionStatus {
    NoAction,
    Simulated,
    Unsupported,
    Executed,
    Failed,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::NoAction => "NO_ACTION",
            ActionStatus::Simulated => "SIMULATED",
            ActionStatus::Unsupported => "UNSUPPORTED",
            ActionStatus::Executed => "EXECUTED",
            ActionStatus::Failed => "FAILED",
        }
    }
}

/// What happened (or would have happened) to one host.
///
/// Built only through the constructors below: `executed` is `true` solely for
/// a live run whose command exited zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub status: ActionStatus,
    pub command: Option<String>,
    pub executed: bool,
    #[serde(default)]
    pub note: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

impl ActionRecord {
    pub fn no_action(note: impl Into<String>) -> Self {
        Self {
            status: ActionStatus::NoAction,
            command: None,
            executed: false,
            note: note.into(),
            error: None,
            exit_code: None,
        }
    }

    pub fn simulated(command: String) -> Self {
        Self {
            status: ActionStatus::Simulated,
            command: Some(command),
            executed: false,
            note: "dry-run".to_string(),
            error: None,
            exit_code: None,
        }
    }

    pub fn unsupported(command: String, os: &str) -> Self {
        Self {
            status: ActionStatus::Unsupported,
            command: Some(command),
            executed: false,
            note: format!("blocking is only supported on linux; no action taken on {}", os),
            error: None,
            exit_code: None,
        }
    }

    pub(crate) fn executed(command: String, output: &CommandOutput) -> Self {
        Self {
            status: ActionStatus::Executed,
            command: Some(command),
            executed: true,
            note: if output.stdout.trim().is_empty() {
                "blocked".to_string()
            } else {
                output.stdout.trim().to_string()
            },
            error: None,
            exit_code: output.exit_code,
        }
    }

    pub fn failed(command: String, error: &ActionError) -> Self {
        let exit_code = match error {
            ActionError::CommandFailed { exit_code, .. } => *exit_code,
            _ => None,
        };
        Self {
            status: ActionStatus::Failed,
            command: Some(command),
            executed: false,
            note: "block attempt failed".to_string(),
            error: Some(error.to_string()),
            exit_code,
        }
    }
}

// ============================================================================
// COMMAND EXECUTION
// ============================================================================

/// Captured result of a finished child process
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, Error)]
pub enum ActionError {
    #[error("refusing to block '{0}': not an IP address")]
    InvalidTarget(String),

    #[error("command '{command}' failed ({exit_code:?}): {stderr}")]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("command '{command}' timed out after {timeout:?}")]
    Timeout { command: String, timeout: std::time::Duration },

    #[error("failed to spawn '{command}': {message}")]
    Spawn { command: String, message: String },

    #[error("no command runner configured for live mode")]
    NoRunner,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mode_is_simulate() {
        assert_eq!(ActionMode::default(), ActionMode::Simulate);
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("none".parse::<ActionMode>(), Ok(ActionMode::NoAction));
        assert_eq!("Simulate".parse::<ActionMode>(), Ok(ActionMode::Simulate));
        assert_eq!("live".parse::<ActionMode>(), Ok(ActionMode::Live));
        assert!("both".parse::<ActionMode>().is_err());
    }

    #[test]
    fn test_only_executed_constructor_sets_executed() {
        let cmd = "iptables -A INPUT -s 10.0.0.1 -j DROP".to_string();
        assert!(!ActionRecord::no_action("no action").executed);
        assert!(!ActionRecord::simulated(cmd.clone()).executed);
        assert!(!ActionRecord::unsupported(cmd.clone(), "windows").executed);
        assert!(!ActionRecord::failed(cmd.clone(), &ActionError::NoRunner).executed);

        let ok = CommandOutput { success: true, exit_code: Some(0), ..Default::default() };
        let rec = ActionRecord::executed(cmd, &ok);
        assert!(rec.executed);
        assert_eq!(rec.status, ActionStatus::Executed);
    }

    #[test]
    fn test_failed_keeps_exit_code() {
        let err = ActionError::CommandFailed {
            command: "sudo".to_string(),
            exit_code: Some(4),
            stderr: "permission denied".to_string(),
        };
        let rec = ActionRecord::failed("iptables".to_string(), &err);
        assert_eq!(rec.exit_code, Some(4));
        assert!(rec.error.unwrap().contains("permission denied"));
    }

    #[test]
    fn test_status_serializes_screaming() {
        let rec = ActionRecord::simulated("x".to_string());
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["status"], "SIMULATED");
        assert!(json.get("error").is_none());
    }
}
