//! Admission decisions.
//!
//! # Responsibilities
//! - Resolve the requesting address to its rule
//! - Check the rule's minimum delay against the ledger
//! - Record the admission in the same atomic step
//!
//! # Design Decisions
//! - Single-slot bucket per ledger key, refilled once per `minimum_delay`
//! - The first request for a key is always admitted
//! - Rejection is a normal outcome, not an error
//! - Time is passed in so decisions are deterministic under test

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SubsecRound, Utc};

use crate::ledger::{DelayLedger, LedgerError};
use crate::rules::{RouteRule, RuleTable};

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The request may proceed; the ledger now holds the admission time.
    Admit(RouteRule),
    /// The request arrived within the rule's minimum delay.
    Reject {
        rule: RouteRule,
        /// Whole seconds since the last admission for the rule's key.
        elapsed_secs: i64,
    },
}

impl Decision {
    pub fn rule(&self) -> &RouteRule {
        match self {
            Decision::Admit(rule) => rule,
            Decision::Reject { rule, .. } => rule,
        }
    }

    pub fn is_admitted(&self) -> bool {
        matches!(self, Decision::Admit(_))
    }
}

/// Gatekeeper combining the rule table and the delay ledger.
#[derive(Debug, Clone)]
pub struct AdmissionEngine {
    rules: Arc<RuleTable>,
    ledger: Arc<DelayLedger>,
}

impl AdmissionEngine {
    pub fn new(rules: Arc<RuleTable>, ledger: Arc<DelayLedger>) -> Self {
        Self { rules, ledger }
    }

    /// Decide whether a request from `addr` arriving at `now` is admitted.
    pub fn decide(&self, addr: IpAddr, now: DateTime<Utc>) -> Result<Decision, LedgerError> {
        let rule = *self.rules.lookup(addr);
        let key = rule.source.ledger_key();
        let now = now.trunc_subsecs(0);
        let delay = delay_secs(rule.minimum_delay);

        let mut elapsed_secs = delay;
        let admitted = self.ledger.record_if(&key, now, |last| {
            if let Some(last) = last {
                elapsed_secs = (now - last).num_seconds();
            }
            elapsed_secs >= delay
        })?;

        tracing::debug!(
            peer = %addr,
            key = %key,
            elapsed_secs,
            delay_secs = delay,
            admitted,
            "Admission check"
        );

        if admitted {
            Ok(Decision::Admit(rule))
        } else {
            Ok(Decision::Reject { rule, elapsed_secs })
        }
    }

    pub fn ledger(&self) -> &DelayLedger {
        &self.ledger
    }
}

fn delay_secs(delay: Duration) -> i64 {
    i64::try_from(delay.as_secs()).unwrap_or(i64::MAX)
}
