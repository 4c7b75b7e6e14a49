//! Forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! admitted request (body bytes) + rule target
//!     → client.rs (POST http://[dest]:port/, bounded by timeout)
//!     → Forwarded | UnreachableDestination | Timeout
//! ```

pub mod client;

pub use client::{ForwardError, Forwarded, Forwarder};
