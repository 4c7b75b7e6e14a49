//! Forwarding filter (v1)
//!
//! An HTTP filter that forwards payloads per a rule file, holding each
//! source to a minimum delay between forwards.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────┐
//!                     │                  FORWARD FILTER                   │
//!                     │                                                   │
//!   POST/PUT /        │  ┌────────┐   ┌───────────┐   ┌──────────────┐   │
//!   ──────────────────┼─▶│  http  │──▶│ admission │──▶│  forwarder   │───┼──▶ Destination
//!                     │  │ server │   │  engine   │   │ (POST, t/o)  │   │
//!                     │  └────────┘   └─────┬─────┘   └──────────────┘   │
//!   "Success" /       │       ▲             │                            │
//!   "Failure" / 5xx   │       │       ┌─────┴─────┐   ┌──────────────┐   │
//!   ◀─────────────────┼───────┘       │ rule table│   │ delay ledger │   │
//!                     │               │ (startup) │   │ (persisted)  │   │
//!                     │               └───────────┘   └──────────────┘   │
//!                     └──────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use forward_filter::config::{read_config, validate_config, ConfigError, FilterConfig};
use forward_filter::lifecycle::{self, signals, Shutdown};
use forward_filter::observability::logging;

#[derive(Parser)]
#[command(name = "forward-filter")]
#[command(
    about = "HTTP filter that forwards HTTP requests but gives them a fixed delay",
    long_about = None
)]
struct Cli {
    /// Optional TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// The path to the rule file for this program.
    #[arg(long)]
    rule_path: Option<PathBuf>,

    /// The port to run the server on.
    #[arg(short, long)]
    port: Option<u16>,

    /// Where to persist the delay ledger (default: beside the rule file).
    /// Pass an empty string to keep it in memory.
    #[arg(long)]
    ledger_path: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> Result<FilterConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => FilterConfig::default(),
        };

        if let Some(path) = self.rule_path {
            config.rules.path = path;
        }
        if let Some(path) = self.ledger_path {
            config.ledger.path = Some(path);
        }
        if let Some(port) = self.port {
            config.listener.bind_address = match config.listener.bind_address.parse::<SocketAddr>() {
                Ok(mut addr) => {
                    addr.set_port(port);
                    addr.to_string()
                }
                Err(_) => format!("[::]:{}", port),
            };
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Cli::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("forward-filter: {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init(&config.observability.log_level);

    tracing::info!("forward-filter v0.1.0 starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        rule_path = %config.rules.path.display(),
        ledger_path = %config.ledger_path().display(),
        forward_timeout_secs = config.timeouts.forward_secs,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    match lifecycle::start(config, &shutdown).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            ExitCode::FAILURE
        }
    }
}
