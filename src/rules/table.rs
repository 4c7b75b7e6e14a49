//! Rule lookup.
//!
//! # Responsibilities
//! - Store validated rules keyed by canonical source
//! - Resolve a requesting address to its rule
//! - Fall back to the default rule when no exact entry exists
//!
//! # Design Decisions
//! - Immutable after construction (shared via Arc without locks)
//! - O(1) lookup via HashMap
//! - Lookup never fails: a default entry always exists

use std::collections::HashMap;
use std::net::{IpAddr, Ipv6Addr};

use crate::rules::rule::{RouteRule, RuleSource};

/// Routing table from source address to rule.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: HashMap<Ipv6Addr, RouteRule>,
    default: RouteRule,
}

#[allow(clippy::len_without_is_empty)]
impl RuleTable {
    /// Build a table from validated rules. Later rules for the same source
    /// replace earlier ones. A null default is added when none is given.
    pub(crate) fn from_rules(rules: impl IntoIterator<Item = RouteRule>) -> Self {
        let mut table = HashMap::new();
        let mut default = None;
        for rule in rules {
            match rule.source {
                RuleSource::Default => default = Some(rule),
                RuleSource::Address(addr) => {
                    table.insert(addr, rule);
                }
            }
        }
        Self {
            rules: table,
            default: default.unwrap_or_else(RouteRule::null_default),
        }
    }

    /// Resolve the rule for a requesting address.
    pub fn lookup(&self, addr: IpAddr) -> &RouteRule {
        self.rules
            .get(&canonicalize(addr))
            .unwrap_or(&self.default)
    }

    /// The fallback rule.
    pub fn default_rule(&self) -> &RouteRule {
        &self.default
    }

    /// Number of rules, the default included.
    pub fn len(&self) -> usize {
        self.rules.len() + 1
    }

    /// Iterate over all rules, the default last.
    pub fn iter(&self) -> impl Iterator<Item = &RouteRule> {
        self.rules.values().chain(std::iter::once(&self.default))
    }
}

/// Map any peer address into the IPv6 key space.
pub fn canonicalize(addr: IpAddr) -> Ipv6Addr {
    match addr {
        IpAddr::V4(v4) => v4.to_ipv6_mapped(),
        IpAddr::V6(v6) => v6,
    }
}
