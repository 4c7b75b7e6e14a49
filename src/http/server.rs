//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the filter handler on `/`
//! - Wire up middleware (tracing, body limit, timeout, request ID)
//! - Bind server to listener
//! - Run admission, then forward admitted payloads
//! - Drain in-flight requests on shutdown

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, DefaultBodyLimit, State},
    http::HeaderMap,
    response::Response,
    routing::post,
    Router,
};
use chrono::Utc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use uuid::Uuid;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admission::{AdmissionEngine, Decision};
use crate::config::FilterConfig;
use crate::forwarder::Forwarder;
use crate::http::response::{self, FilterError, FilterOutcome};
use crate::ledger::DelayLedger;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::rules::RuleTable;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: AdmissionEngine,
    pub forwarder: Forwarder,
}

/// HTTP server for the forwarding filter.
pub struct FilterServer {
    router: Router,
}

impl FilterServer {
    /// Create a new server from a validated config, a loaded rule table and
    /// an open ledger.
    pub fn new(config: FilterConfig, rules: Arc<RuleTable>, ledger: Arc<DelayLedger>) -> Self {
        let state = AppState {
            engine: AdmissionEngine::new(rules, ledger),
            forwarder: Forwarder::new(Duration::from_secs(config.timeouts.forward_secs)),
        };

        Self {
            router: Self::build_router(&config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &FilterConfig, state: AppState) -> Router {
        Router::new()
            .route("/", post(filter_handler).put(filter_handler))
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server until a shutdown signal arrives.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                Shutdown::wait(shutdown).await;
                tracing::info!("Shutdown signal received, draining requests");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Filter handler for `POST /` and `PUT /`.
async fn filter_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    tracing::debug!(
        request_id = %request_id,
        peer = %peer.ip(),
        bytes = body.len(),
        "Filtering request"
    );

    let result = process(&state, peer.ip(), body).await;
    response::respond(peer, &request_id, result)
}

/// Admit, route and forward one payload.
///
/// The admission check writes the ledger snapshot, so it runs on the
/// blocking pool.
pub async fn process(state: &AppState, peer: IpAddr, body: Bytes) -> Result<FilterOutcome, FilterError> {
    let engine = state.engine.clone();
    let now = Utc::now();
    let decision = tokio::task::spawn_blocking(move || engine.decide(peer, now)).await??;
    metrics::record_ledger_keys(state.engine.ledger().len());

    let rule = match decision {
        Decision::Admit(rule) => rule,
        Decision::Reject { rule, elapsed_secs } => {
            return Ok(FilterOutcome::RateLimited {
                source: rule.source,
                elapsed_secs,
            });
        }
    };

    let Some(target) = rule.target() else {
        return Ok(FilterOutcome::NotRouted);
    };

    let forwarded = state.forwarder.forward(target, body).await?;
    Ok(FilterOutcome::Forwarded(forwarded))
}
