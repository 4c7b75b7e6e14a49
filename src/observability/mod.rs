//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields (peer, key, target) on every decision log line
//! - Request ID flows from the HTTP layer into handler spans
//! - Metrics are optional and cheap when disabled

pub mod logging;
pub mod metrics;
