//! Outcome to response mapping.
//!
//! # Responsibilities
//! - Turn each handler outcome into a status code and body
//! - Emit one log line and one metric per request
//!
//! # Design Decisions
//! - Rejections answer 200 with the `Failure` token; they are not errors
//! - Forwarding failures answer 5xx so callers can tell them apart
//! - The mapping is a single exhaustive match

use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::forwarder::{ForwardError, Forwarded};
use crate::ledger::LedgerError;
use crate::observability::metrics;
use crate::rules::RuleSource;

/// Body returned when a payload was forwarded.
pub const SUCCESS: &str = "Success";

/// Body returned when a payload was rejected or not routed.
pub const FAILURE: &str = "Failure";

/// Normal outcomes of the filter handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    /// Admitted and delivered to the destination.
    Forwarded(Forwarded),
    /// Arrived within the rule's minimum delay.
    RateLimited {
        source: RuleSource,
        elapsed_secs: i64,
    },
    /// Admitted, but the rule has no destination.
    NotRouted,
}

/// Failures of the filter handler.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error(transparent)]
    Forward(#[from] ForwardError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("admission task failed: {0}")]
    Admission(#[from] tokio::task::JoinError),
}

/// Build the response for a handled request, logging the outcome.
pub fn respond(peer: SocketAddr, request_id: &str, result: Result<FilterOutcome, FilterError>) -> Response {
    match result {
        Ok(FilterOutcome::Forwarded(forwarded)) => {
            tracing::info!(
                request_id = %request_id,
                peer = %peer.ip(),
                target = %forwarded.target,
                status = %forwarded.status,
                "Forwarded message"
            );
            metrics::record_request("forwarded");
            (StatusCode::OK, SUCCESS).into_response()
        }
        Ok(FilterOutcome::RateLimited { source, elapsed_secs }) => {
            tracing::info!(
                request_id = %request_id,
                peer = %peer.ip(),
                key = %source,
                elapsed_secs,
                "Rejected message due to delay limit"
            );
            metrics::record_request("rate_limited");
            (StatusCode::OK, FAILURE).into_response()
        }
        Ok(FilterOutcome::NotRouted) => {
            tracing::info!(
                request_id = %request_id,
                peer = %peer.ip(),
                "Source had null destination, message not routed"
            );
            metrics::record_request("not_routed");
            (StatusCode::OK, FAILURE).into_response()
        }
        Err(FilterError::Forward(ForwardError::UnreachableDestination { target, source })) => {
            tracing::error!(request_id = %request_id, peer = %peer.ip(), target = %target, error = %source, "Could not connect to destination");
            tracing::debug!("Is there a server listening at {}?", target);
            metrics::record_request("unreachable");
            (StatusCode::BAD_GATEWAY, "Unreachable destination").into_response()
        }
        Err(FilterError::Forward(ForwardError::Timeout { target, after })) => {
            tracing::error!(request_id = %request_id, peer = %peer.ip(), target = %target, timeout = ?after, "Forward timed out");
            metrics::record_request("timeout");
            (StatusCode::GATEWAY_TIMEOUT, "Destination timed out").into_response()
        }
        Err(
            e @ (FilterError::Forward(ForwardError::Request { .. })
            | FilterError::Ledger(_)
            | FilterError::Admission(_)),
        ) => {
            tracing::error!(request_id = %request_id, peer = %peer.ip(), error = %e, "Request failed");
            tracing::debug!("Nothing is known about the last error.");
            metrics::record_request("internal_error");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
        }
    }
}
