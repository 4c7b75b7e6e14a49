//! Routing rule subsystem.
//!
//! # Data Flow
//! ```text
//! rule file (JSON list of objects)
//!     → parser.rs (decode, validate entry by entry)
//!     → RouteRule[] (rule.rs)
//!     → table.rs (keyed by canonical source, default synthesized)
//!     → RuleTable (immutable, shared via Arc)
//! ```
//!
//! # Design Decisions
//! - Loaded once at startup; any error is fatal
//! - Source addresses are canonical IPv6; IPv4 peers are mapped
//! - Rules without `in` bind the `DEFAULT` source

pub mod error;
pub mod parser;
pub mod rule;
pub mod table;

pub use error::RuleError;
pub use parser::{load_rule_file, parse_rules, parse_rules_with_mode, ParseMode};
pub use rule::{RouteRule, RuleSource, DEFAULT_SOURCE};
pub use table::RuleTable;
