//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → command-line overrides (main.rs)
//!     → validation.rs (semantic checks)
//!     → FilterConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; no runtime reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Routing rules are a separate file with their own validator

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{read_config, ConfigError};
pub use schema::FilterConfig;
pub use schema::{
    LedgerConfig, ListenerConfig, ObservabilityConfig, RulesConfig, SecurityConfig,
    TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
