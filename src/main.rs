//! Admission gate
//!
//! A reverse proxy that sits in front of a web application and decides, per
//! request, whether it may proceed.
//!
//! ```text
//!     Client Request
//!     ──────────────▶ request id ─▶ preflight? ─▶ bypass? ─▶ identity
//!                                                              │
//!                     ┌────────────────────────────────────────┘
//!                     ▼
//!                   CORS ─▶ rate limit ─▶ auth gate ─▶ upstream
//!                     │          │            │
//!                    403        429      401 / 307 login
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use admission_gate::config::{finalize, load_config};
use admission_gate::lifecycle::wait_for_shutdown_signal;
use admission_gate::observability::{init_logging, init_metrics};
use admission_gate::{GateConfig, HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "admission-gate")]
#[command(about = "Admission gate in front of a web application", long_about = None)]
struct Args {
    /// TOML configuration file; built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => finalize(GateConfig::standard())?,
    };

    if args.check {
        println!("Configuration OK");
        return Ok(());
    }

    init_logging(&config.observability)?;

    tracing::info!("admission-gate v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        environment = ?config.environment,
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.url,
        routes = config.routes.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config)?;

    let shutdown = Arc::new(Shutdown::new());
    let receiver = shutdown.subscribe();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        trigger.trigger();
    });

    server.run(listener, receiver).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
