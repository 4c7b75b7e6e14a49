//! Admission control subsystem.
//!
//! # Data Flow
//! ```text
//! peer address
//!     → RuleTable::lookup (rule, default fallback)
//!     → ledger key = rule source
//!     → DelayLedger::record_if (elapsed >= minimum_delay ?)
//!     → Decision::Admit | Decision::Reject
//! ```

pub mod engine;

pub use engine::{AdmissionEngine, Decision};
