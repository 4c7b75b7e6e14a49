//! Route rule definitions.
//!
//! A `RouteRule` binds a source identity to a destination and a minimum
//! re-forward delay. Rules are created by the parser and never mutated.

use std::fmt;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::time::Duration;

/// Source identity of the fallback rule.
pub const DEFAULT_SOURCE: &str = "DEFAULT";

/// Source identity a rule is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleSource {
    /// Fallback rule for any address without an explicit entry.
    Default,
    /// Explicit source address.
    Address(Ipv6Addr),
}

impl RuleSource {
    /// Key under which admissions for this rule are recorded in the ledger.
    ///
    /// Every address that falls through to the default rule shares the
    /// `DEFAULT` key, and therefore one rate limit.
    pub fn ledger_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RuleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleSource::Default => f.write_str(DEFAULT_SOURCE),
            RuleSource::Address(addr) => write!(f, "{}", addr),
        }
    }
}

/// A validated forwarding rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteRule {
    /// Canonical source address, or the default sentinel.
    pub source: RuleSource,

    /// Destination address. `None` means "do not forward".
    pub destination: Option<Ipv6Addr>,

    /// Destination port.
    pub destination_port: u16,

    /// Minimum time between two admitted forwards for this rule's key.
    pub minimum_delay: Duration,
}

impl RouteRule {
    /// The rule synthesized when the rule file has no default entry.
    pub fn null_default() -> Self {
        Self {
            source: RuleSource::Default,
            destination: None,
            destination_port: 0,
            minimum_delay: Duration::ZERO,
        }
    }

    /// Socket address to forward to, if this rule routes anywhere.
    ///
    /// IPv4-mapped destinations are dialed over IPv4.
    pub fn target(&self) -> Option<SocketAddr> {
        self.destination.map(|addr| {
            let ip = match addr.to_ipv4_mapped() {
                Some(v4) => IpAddr::V4(v4),
                None => IpAddr::V6(addr),
            };
            SocketAddr::new(ip, self.destination_port)
        })
    }
}
