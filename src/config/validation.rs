//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: FilterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::FilterConfig;

/// A single semantic problem in the process configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: `{value}` is not a socket address")]
    BadAddress { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("timeouts.forward_secs ({forward}) must be below timeouts.request_secs ({request})")]
    ForwardExceedsRequest { forward: u64, request: u64 },

    #[error("rules.path is empty")]
    NoRulePath,
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &FilterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BadAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.rules.path.as_os_str().is_empty() {
        errors.push(ValidationError::NoRulePath);
    }

    let timeouts = &config.timeouts;
    if timeouts.forward_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "timeouts.forward_secs",
        });
    }
    if timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "timeouts.request_secs",
        });
    }
    if timeouts.forward_secs > 0 && timeouts.forward_secs >= timeouts.request_secs {
        errors.push(ValidationError::ForwardExceedsRequest {
            forward: timeouts.forward_secs,
            request: timeouts.request_secs,
        });
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::Zero {
            field: "security.max_body_size",
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::BadAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
