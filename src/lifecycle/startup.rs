//! Startup orchestration.
//!
//! # Responsibilities
//! - Load the rule table and open the delay ledger
//! - Initialize metrics when enabled
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listener binds last (traffic only when rules and ledger are ready)

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::FilterConfig;
use crate::http::FilterServer;
use crate::ledger::{DelayLedger, LedgerError};
use crate::lifecycle::shutdown::Shutdown;
use crate::observability::metrics;
use crate::rules::{load_rule_file, RuleError, RuleTable};

/// Errors that prevent the filter from serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("rule file error: {0}")]
    Rules(#[from] RuleError),

    #[error("delay ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Load the rule table named by the config.
pub fn load_rules(config: &FilterConfig) -> Result<Arc<RuleTable>, StartupError> {
    let table = match load_rule_file(&config.rules.path) {
        Ok(table) => table,
        Err(e) => {
            tracing::error!(kind = e.kind(), error = %e, "Failed to load rule file");
            tracing::debug!("{}", e.hint());
            return Err(e.into());
        }
    };

    tracing::info!(
        path = %config.rules.path.display(),
        rules = table.len(),
        "Rule table loaded"
    );
    for rule in table.iter() {
        tracing::debug!(
            source = %rule.source,
            target = ?rule.target(),
            delay_secs = rule.minimum_delay.as_secs(),
            "Route rule"
        );
    }
    Ok(Arc::new(table))
}

/// Open the delay ledger named by the config.
pub fn open_ledger(config: &FilterConfig) -> Result<Arc<DelayLedger>, StartupError> {
    let path = config.ledger_path();
    let ledger = if path.as_os_str().is_empty() {
        tracing::warn!("No ledger path configured, rate-limit state will not survive restarts");
        DelayLedger::in_memory()
    } else {
        DelayLedger::open(&path).inspect_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "Failed to open delay ledger");
        })?
    };
    metrics::record_ledger_keys(ledger.len());
    Ok(Arc::new(ledger))
}

/// Bring the filter up and serve until `shutdown` fires.
pub async fn start(config: FilterConfig, shutdown: &Shutdown) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let rules = load_rules(&config)?;
    let ledger = open_ledger(&config)?;

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.listener.bind_address.clone(),
            source,
        })?;

    let server = FilterServer::new(config, rules, ledger);
    server
        .run(listener, shutdown.subscribe())
        .await
        .map_err(StartupError::Serve)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_rule_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".RULE");
        std::fs::write(&path, r#"[{"out": "2001:db8::2"}]"#).unwrap();

        let mut config = FilterConfig::default();
        config.rules.path = path;
        assert!(matches!(
            load_rules(&config),
            Err(StartupError::Rules(RuleError::MissingField { field: "out_port", .. }))
        ));
    }

    #[test]
    fn test_empty_ledger_path_is_in_memory() {
        let mut config = FilterConfig::default();
        config.ledger.path = Some(Default::default());
        let ledger = open_ledger(&config).unwrap();
        assert!(ledger.path().is_none());
    }

    #[test]
    fn test_ledger_opens_beside_rule_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = FilterConfig::default();
        config.rules.path = dir.path().join("rules").join(".RULE");

        let ledger = open_ledger(&config).unwrap();
        let expected = dir.path().join("rules").join("DELAY_LEDGER.json");
        assert_eq!(ledger.path(), Some(expected.as_path()));
        assert!(expected.exists());
    }

    #[test]
    fn test_unwritable_ledger_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();

        let mut config = FilterConfig::default();
        config.ledger.path = Some(blocker.join("DELAY_LEDGER.json"));
        assert!(matches!(open_ledger(&config), Err(StartupError::Ledger(_))));
    }

    #[tokio::test]
    async fn test_missing_rule_file_stops_startup() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = FilterConfig::default();
        config.listener.bind_address = "127.0.0.1:0".into();
        config.rules.path = dir.path().join("absent.json");
        config.ledger.path = Some(dir.path().join("ledger.json"));

        let err = start(config, &Shutdown::new()).await.unwrap_err();
        assert!(matches!(err, StartupError::Rules(RuleError::Unreadable { .. })));
    }
}
