//! Delay ledger subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     snapshot file (JSON rows)
//!     → record.rs (LedgerRecord::decode, one row at a time)
//!     → store.rs (DashMap index)
//!
//! Per admission:
//!     store.rs record_if (entry lock held for read-compare-write)
//!     → snapshot rewritten before the decision is returned
//! ```
//!
//! # Design Decisions
//! - Keys are rule sources, not literal peers (`DEFAULT` is shared)
//! - Timestamps are UTC with whole-second precision
//! - Entries are never deleted during normal operation

pub mod record;
pub mod store;

use thiserror::Error;

pub use record::{LedgerEntry, LedgerRecord};
pub use store::DelayLedger;

/// Errors raised by the delay ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Reading or writing the snapshot failed.
    #[error("ledger I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot is not a JSON list of records.
    #[error("ledger format error: {0}")]
    Format(#[from] serde_json::Error),

    /// A stored record could not be decoded.
    #[error("corrupt ledger record {index}: {reason}")]
    Corrupt { index: usize, reason: String },
}
