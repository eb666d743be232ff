//! healthpolld — the healthpoll daemon.
//!
//! Polls a fixed set of gRPC health endpoints forever, sleeping a
//! randomized interval between rounds, and logs network diagnostics from
//! the client stack alongside the results.
//!
//! # Usage
//!
//! ```text
//! healthpolld http://10.0.0.1:50051 https://api.example.com
//! healthpolld --config /etc/healthpoll.toml --max-delay-ms 60000
//! ```

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use healthpoll_diag::{diagnostics_layer, forward, DiagnosticBridge, DiagnosticsLayer, EventRegistry, TracingSink};
use healthpoll_probe::{run_polling, Endpoint, GrpcLivenessClient, HealthPoller, JitterScheduler, ProbeError};

use crate::config::{FileConfig, Overrides, Settings};

const DEFAULT_LOG_FILTER: &str = "info,healthpoll=debug,healthpolld=debug";

#[derive(Parser)]
#[command(name = "healthpolld", about = "Polls gRPC health endpoints forever", version)]
struct Cli {
    /// Endpoints to check: http://host:port, https://host, or host:port.
    endpoints: Vec<String>,

    /// TOML config file; its endpoints come before the ones given here.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Health service name to check [default: live].
    #[arg(long)]
    service: Option<String>,

    /// Upper bound of the delay between rounds, in milliseconds [default: 1200000].
    #[arg(long)]
    max_delay_ms: Option<u64>,

    /// Do not capture network diagnostics.
    #[arg(long)]
    no_diagnostics: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            endpoints: self.endpoints.clone(),
            service: self.service.clone(),
            max_delay_ms: self.max_delay_ms,
            no_diagnostics: self.no_diagnostics,
        }
    }
}

type Base = Layered<Option<DiagnosticsLayer>, Registry>;

/// Install the global subscriber. The diagnostics layer sits below the
/// `RUST_LOG` filter so it sees the network stack at every level.
fn init_logging(json: bool, diagnostics: Option<DiagnosticsLayer>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let output: Box<dyn Layer<Base> + Send + Sync> = if json {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(diagnostics)
        .with(output.with_filter(filter))
        .try_init()
        .context("installing tracing subscriber")?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let file = match &cli.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };
    let settings = Settings::merge(file, cli.overrides());

    let (layer, notices) = if settings.diagnostics {
        let (layer, notices) = diagnostics_layer();
        (Some(layer), Some(notices))
    } else {
        (None, None)
    };
    init_logging(cli.log_json, layer)?;
    info!("logger is initialized");

    // ── Diagnostics ────────────────────────────────────────────

    let registry = EventRegistry::new();
    if let Some(notices) = notices {
        DiagnosticBridge::attach(&registry, Arc::new(TracingSink));
        tokio::spawn(forward(notices, registry.clone()));
        info!("network diagnostics enabled");
    }

    // ── Endpoints ──────────────────────────────────────────────

    let clients = settings
        .endpoints
        .iter()
        .map(|address| {
            let endpoint = Endpoint::parse(address)?;
            GrpcLivenessClient::connect_lazy(&endpoint, &registry)
        })
        .collect::<Result<Vec<_>, ProbeError>>()
        .context("setting up health clients")?;

    if clients.is_empty() {
        warn!("no endpoints configured, rounds will be empty");
    }

    let poller = HealthPoller::new(clients, settings.service);
    let mut scheduler = JitterScheduler::new(settings.max_delay);

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown signal received");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => error!(error = %e, "failed to install Ctrl-C handler"),
        }
    });

    run_polling(&poller, &mut scheduler, shutdown_rx).await;

    info!("healthpolld stopped");
    Ok(())
}
