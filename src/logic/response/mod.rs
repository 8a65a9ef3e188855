//! Response Module - gated mitigation for flagged hosts
//!
//! # Components
//! - `types.rs`: action mode, action record, errors
//! - `network.rs`: firewall rule construction and platform check
//! - `runner.rs`: process execution with a timeout
//! - `gate.rs`: the per-host state machine

pub mod gate;
pub mod network;
pub mod runner;
pub mod types;

pub use gate::{ActionGate, ExecOptions};
pub use network::BlockCommand;
pub use runner::{CommandRunner, SystemRunner};
pub use types::{ActionError, ActionMode, ActionRecord, ActionStatus, CommandOutput};
