//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (peer address captured via ConnectInfo)
//!     → server.rs (Axum setup, request ID, body limit)
//!     → admission (rule lookup, delay ledger)
//!     → forwarder (POST to destination)
//!     → response.rs (outcome → `Success` / `Failure` / 5xx)
//!     → Send to client
//! ```

pub mod response;
pub mod server;

pub use response::{FilterError, FilterOutcome, FAILURE, SUCCESS};
pub use server::{AppState, FilterServer};
