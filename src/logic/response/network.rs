//! Network Isolation - the firewall rule for one host
//!
//! Uses iptables / ip6tables. The rule is a pure function of the host
//! identifier so the same host always yields the same logged command.

use std::fmt;
use std::net::IpAddr;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Only platform the block rule is known to work on
pub const SUPPORTED_OS: &str = "linux";

const CHAIN: &str = "INPUT";

// ============================================================================
// BLOCK COMMAND
// ============================================================================

/// `iptables -A INPUT -s <host> -j DROP`, or `ip6tables` for IPv6 hosts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockCommand {
    pub program: &'static str,
    pub args: Vec<String>,
}

impl BlockCommand {
    pub fn for_host(host_id: &str) -> Self {
        let program = match host_id.parse::<IpAddr>() {
            Ok(IpAddr::V6(_)) => "ip6tables",
            _ => "iptables",
        };

        Self {
            program,
            args: vec![
                "-A".to_string(),
                CHAIN.to_string(),
                "-s".to_string(),
                host_id.to_string(),
                "-j".to_string(),
                "DROP".to_string(),
            ],
        }
    }

    /// Full argv, optionally behind non-interactive sudo
    pub fn argv(&self, use_sudo: bool) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 3);
        if use_sudo {
            argv.push("sudo".to_string());
            argv.push("-n".to_string());
        }
        argv.push(self.program.to_string());
        argv.extend(self.args.iter().cloned());
        argv
    }
}

impl fmt::Display for BlockCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.program, self.args.join(" "))
    }
}

/// Whether `host_id` is safe to hand to the firewall at all
pub fn parse_target(host_id: &str) -> Option<IpAddr> {
    host_id.parse().ok()
}

/// OS this binary is running on. Never taken from the caller.
pub fn current_os() -> &'static str {
    std::env::consts::OS
}

pub fn is_supported_os(os: &str) -> bool {
    os == SUPPORTED_OS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipv4_rule() {
        let cmd = BlockCommand::for_host("192.168.0.10");
        assert_eq!(cmd.to_string(), "iptables -A INPUT -s 192.168.0.10 -j DROP");
    }

    #[test]
    fn test_ipv6_rule() {
        let cmd = BlockCommand::for_host("fe80::1");
        assert_eq!(cmd.to_string(), "ip6tables -A INPUT -s fe80::1 -j DROP");
    }

    #[test]
    fn test_rule_is_deterministic() {
        assert_eq!(BlockCommand::for_host("10.1.1.1"), BlockCommand::for_host("10.1.1.1"));
    }

    #[test]
    fn test_sudo_argv() {
        let cmd = BlockCommand::for_host("10.0.0.1");
        assert_eq!(
            cmd.argv(true),
            vec!["sudo", "-n", "iptables", "-A", "INPUT", "-s", "10.0.0.1", "-j", "DROP"]
        );
        assert_eq!(cmd.argv(false)[0], "iptables");
    }

    #[test]
    fn test_parse_target_rejects_names() {
        assert!(parse_target("10.0.0.1").is_some());
        assert!(parse_target("host; rm -rf /").is_none());
        assert!(parse_target("").is_none());
    }
}
