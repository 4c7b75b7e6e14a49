//! Rule-driven HTTP forwarding filter.
//!
//! Accepts payloads from known source addresses, looks up each source's
//! route, enforces a per-rule minimum delay between forwards, and relays
//! admitted payloads to their destination.

pub mod admission;
pub mod config;
pub mod forwarder;
pub mod http;
pub mod ledger;
pub mod lifecycle;
pub mod observability;
pub mod rules;

pub use admission::{AdmissionEngine, Decision};
pub use config::FilterConfig;
pub use http::FilterServer;
pub use ledger::DelayLedger;
pub use lifecycle::Shutdown;
pub use rules::{RouteRule, RuleTable};
